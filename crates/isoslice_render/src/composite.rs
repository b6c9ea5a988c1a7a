use image::{Rgba, RgbaImage};

/// Composites `source` onto `target` at `(x, y)`, weighting each pixel by the
/// alpha channel of `mask`. Pixels falling outside `target` are clipped.
pub fn alpha_over(target: &mut RgbaImage, source: &RgbaImage, mask: &RgbaImage, x: i32, y: i32) {
    let width = source.width().min(mask.width());
    let height = source.height().min(mask.height());
    for_each_overlap(target, width, height, x, y, |target, sx, sy, tx, ty| {
        let alpha = u32::from(mask.get_pixel(sx, sy)[3]);
        blend(target.get_pixel_mut(tx, ty), source.get_pixel(sx, sy).0, alpha);
    });
}

/// Composites a flat `colour` through `mask`, with the mask alpha scaled by
/// `strength` (0..=255).
pub fn fill_over(target: &mut RgbaImage, mask: &RgbaImage, colour: [u8; 3], strength: u8, x: i32, y: i32) {
    if strength == 0 {
        return;
    }
    let pixel = [colour[0], colour[1], colour[2], 255];
    let strength = u32::from(strength);
    for_each_overlap(target, mask.width(), mask.height(), x, y, |target, sx, sy, tx, ty| {
        let alpha = u32::from(mask.get_pixel(sx, sy)[3]) * strength / 255;
        blend(target.get_pixel_mut(tx, ty), pixel, alpha);
    });
}

fn for_each_overlap<F>(target: &mut RgbaImage, width: u32, height: u32, x: i32, y: i32, mut apply: F)
where
    F: FnMut(&mut RgbaImage, u32, u32, u32, u32),
{
    let target_w = i64::from(target.width());
    let target_h = i64::from(target.height());
    let x = i64::from(x);
    let y = i64::from(y);

    let start_x = (-x).clamp(0, i64::from(width));
    let start_y = (-y).clamp(0, i64::from(height));
    let end_x = (target_w - x).clamp(0, i64::from(width));
    let end_y = (target_h - y).clamp(0, i64::from(height));

    for sy in start_y..end_y {
        for sx in start_x..end_x {
            apply(
                target,
                sx as u32,
                sy as u32,
                (x + sx) as u32,
                (y + sy) as u32,
            );
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: [u8; 4], alpha: u32) {
    if alpha == 0 {
        return;
    }
    let inv = 255 - alpha;
    for channel in 0..3 {
        let mixed = u32::from(src[channel]) * alpha + u32::from(dst[channel]) * inv;
        dst[channel] = ((mixed + 127) / 255) as u8;
    }
    let out_alpha = alpha + (u32::from(dst[3]) * inv + 127) / 255;
    dst[3] = out_alpha.min(255) as u8;
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{alpha_over, fill_over};

    #[test]
    fn opaque_mask_replaces_pixels() {
        let mut target = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let source = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255]));
        alpha_over(&mut target, &source, &source, 1, 1);

        assert_eq!(target.get_pixel(1, 1), &Rgba([200, 100, 50, 255]));
        assert_eq!(target.get_pixel(2, 2), &Rgba([200, 100, 50, 255]));
        assert_eq!(target.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(target.get_pixel(3, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn transparent_mask_leaves_target_untouched() {
        let mut target = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        let source = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255]));
        let mask = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        alpha_over(&mut target, &source, &mask, 0, 0);
        assert_eq!(target.get_pixel(1, 1), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn half_alpha_mixes_colours() {
        let mut target = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let source = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let mask = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        alpha_over(&mut target, &source, &mask, 0, 0);
        let pixel = target.get_pixel(0, 0);
        assert_eq!(pixel[0], 128);
        assert_eq!(pixel[3], 255);
    }

    #[test]
    fn drawing_off_the_edges_is_clipped() {
        let mut target = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let source = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        alpha_over(&mut target, &source, &source, -2, 3);
        assert_eq!(target.get_pixel(0, 3), &Rgba([1, 2, 3, 255]));
        assert_eq!(target.get_pixel(1, 3), &Rgba([0, 0, 0, 0]));

        alpha_over(&mut target, &source, &source, 10, -10);
        alpha_over(&mut target, &source, &source, -3, 0);
        assert_eq!(target.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn fill_over_darkens_by_strength() {
        let mut target = RgbaImage::from_pixel(1, 1, Rgba([200, 200, 200, 255]));
        let mask = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        fill_over(&mut target, &mask, [0, 0, 0], 0, 0, 0);
        assert_eq!(target.get_pixel(0, 0)[0], 200);

        fill_over(&mut target, &mask, [0, 0, 0], 255, 0, 0);
        assert_eq!(target.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }
}
