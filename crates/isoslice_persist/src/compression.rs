use std::io;

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

pub fn compress_zstd(data: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(data, level)
}

pub fn decompress_zstd(data: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(data)
}

#[cfg(test)]
mod tests {
    use super::{compress_zstd, decompress_zstd, DEFAULT_ZSTD_LEVEL};

    #[test]
    fn repetitive_section_payloads_shrink() {
        let payload = vec![0u8; 4096 * 4];
        let compressed = compress_zstd(&payload, DEFAULT_ZSTD_LEVEL).expect("compress");
        assert!(compressed.len() < payload.len() / 10);
        assert_eq!(decompress_zstd(&compressed).expect("decompress"), payload);
    }

    #[test]
    fn garbage_fails_to_decompress() {
        assert!(decompress_zstd(b"definitely not zstd").is_err());
    }
}
