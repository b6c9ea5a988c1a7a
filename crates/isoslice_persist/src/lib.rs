pub mod compression;
pub mod region;

pub use region::RegionFile;
