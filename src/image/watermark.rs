use super::badge::Badge;
use super::ImageService;
use async_trait::async_trait;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Gap between the badge and the bottom-right edges, in pixels.
pub const MARGIN: i64 = 10;

/// Stamps generated images with a badge in the bottom-right corner.
pub struct Watermarker {
    badge: Option<Arc<Badge>>,
}

impl Watermarker {
    pub fn new(badge: Option<Badge>) -> Self {
        if badge.is_none() {
            tracing::warn!("No usable watermark badge; images will be stored unmarked");
        }
        Self {
            badge: badge.map(Arc::new),
        }
    }
}

/// Composites `badge` onto `source` and re-encodes as PNG.
///
/// Never fails: an undecodable source comes back untouched, and a badge that
/// cannot be rendered leaves the source re-encoded without it.
pub fn apply_watermark(source: &[u8], badge: Option<&Badge>) -> Vec<u8> {
    let mut canvas = match image::load_from_memory(source) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(e) => {
            tracing::warn!("Cannot decode generated image, skipping watermark: {}", e);
            return source.to_vec();
        }
    };

    match badge.and_then(|badge| badge.render(canvas.width() / 10)) {
        Some(mark) => {
            let x = i64::from(canvas.width()) - i64::from(mark.width()) - MARGIN;
            let y = i64::from(canvas.height()) - i64::from(mark.height()) - MARGIN;
            image::imageops::overlay(&mut canvas, &mark, x, y);
            tracing::debug!(
                "Watermark {}x{} placed at ({}, {})",
                mark.width(),
                mark.height(),
                x,
                y
            );
        }
        None => tracing::warn!("Watermark unavailable, returning unmarked image"),
    }

    match encode_png(&canvas) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to encode watermarked PNG: {}", e);
            source.to_vec()
        }
    }
}

fn encode_png(canvas: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[async_trait]
impl ImageService for Watermarker {
    async fn watermark(&self, image_data: &[u8]) -> Vec<u8> {
        let badge = self.badge.clone();
        let source = image_data.to_vec();
        let result =
            tokio::task::spawn_blocking(move || apply_watermark(&source, badge.as_deref())).await;

        match result {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Watermark task join error: {}", e);
                image_data.to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        })
    }

    fn png(img: &RgbaImage) -> Vec<u8> {
        encode_png(img).unwrap()
    }

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_badge_lands_bottom_right_and_rest_is_untouched() {
        let source = gradient(200, 100);
        let badge = Badge::Raster(RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 255])));

        let output = decode(&apply_watermark(&png(&source), Some(&badge)));

        assert_eq!(output.dimensions(), source.dimensions());
        // Badge is 20x10 at x 170..190, y 80..90.
        assert_eq!(*output.get_pixel(175, 85), Rgba([255, 0, 0, 255]));
        assert_eq!(*output.get_pixel(189, 89), Rgba([255, 0, 0, 255]));
        for (x, y) in [(0, 0), (169, 85), (190, 85), (175, 79), (175, 90), (199, 99)] {
            assert_eq!(output.get_pixel(x, y), source.get_pixel(x, y), "pixel {x},{y}");
        }
    }

    #[test]
    fn test_transparent_badge_pixels_keep_source() {
        let source = gradient(100, 100);
        let mut badge_img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255]));
        for x in 0..10 {
            badge_img.put_pixel(x, 0, Rgba([0, 0, 0, 0]));
        }
        let badge = Badge::Raster(badge_img);

        let output = decode(&apply_watermark(&png(&source), Some(&badge)));
        // Badge is 10x10 at (80, 80); its top row is fully transparent.
        assert_eq!(output.get_pixel(85, 80), source.get_pixel(85, 80));
        assert_eq!(*output.get_pixel(85, 85), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_missing_badge_reencodes_source() {
        let source = gradient(64, 32);
        let output = decode(&apply_watermark(&png(&source), None));
        assert_eq!(output, source);
    }

    #[test]
    fn test_undecodable_badge_reencodes_source() {
        let source = gradient(64, 32);
        let badge = Badge::from_bytes(b"<not-an-image>");
        let output = decode(&apply_watermark(&png(&source), badge.as_ref()));
        assert_eq!(output, source);
    }

    #[test]
    fn test_undecodable_source_is_returned_unchanged() {
        let garbage = b"not a png".to_vec();
        let badge = Badge::Raster(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        assert_eq!(apply_watermark(&garbage, Some(&badge)), garbage);
    }

    #[test]
    fn test_tiny_source_skips_badge() {
        // 10% of 5px rounds down to zero.
        let source = gradient(5, 5);
        let badge = Badge::Raster(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let output = decode(&apply_watermark(&png(&source), Some(&badge)));
        assert_eq!(output, source);
    }

    #[cfg(feature = "svg")]
    #[test]
    fn test_bundled_svg_badge_is_composited() {
        let source = RgbaImage::from_pixel(500, 300, Rgba([255, 255, 255, 255]));
        let output = decode(&apply_watermark(&png(&source), Badge::bundled().as_ref()));

        assert_eq!(output.dimensions(), (500, 300));
        // Badge is 50x16 at (440, 274); its left edge is the dark background.
        assert_ne!(*output.get_pixel(442, 282), Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(10, 10), Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(495, 295), Rgba([255, 255, 255, 255]));
    }

    #[tokio::test]
    async fn test_watermarker_service_runs_off_thread() {
        let watermarker =
            Watermarker::new(Some(Badge::Raster(RgbaImage::from_pixel(8, 8, Rgba([9, 9, 9, 255])))));
        let source = gradient(120, 120);
        let output = decode(&watermarker.watermark(&png(&source)).await);
        assert_eq!(output.dimensions(), (120, 120));
        assert_eq!(*output.get_pixel(100, 100), Rgba([9, 9, 9, 255]));
    }
}
