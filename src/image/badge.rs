use image::imageops::FilterType;
use image::RgbaImage;
use std::path::Path;

const DEFAULT_BADGE: &[u8] = include_bytes!("../../assets/watermark.svg");

/// The watermark graphic, kept in its source form until the target size is
/// known so vector badges are rasterized once at the right resolution.
pub enum Badge {
    Raster(RgbaImage),
    #[cfg(feature = "svg")]
    Vector(resvg::usvg::Tree),
}

impl Badge {
    /// Returns `None` when the bytes are neither a raster image nor an SVG
    /// this build can rasterize.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if let Ok(raster) = image::load_from_memory(bytes) {
            return Some(Badge::Raster(raster.to_rgba8()));
        }
        Self::from_svg(bytes)
    }

    pub fn load(path: &Path) -> Option<Self> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let badge = Self::from_bytes(&bytes);
                if badge.is_none() {
                    tracing::warn!("Watermark at {} could not be decoded", path.display());
                }
                badge
            }
            Err(e) => {
                tracing::warn!("Watermark file {} not readable: {}", path.display(), e);
                None
            }
        }
    }

    /// The bundled SVG badge.
    pub fn bundled() -> Option<Self> {
        Self::from_bytes(DEFAULT_BADGE)
    }

    #[cfg(feature = "svg")]
    fn from_svg(bytes: &[u8]) -> Option<Self> {
        let options = resvg::usvg::Options::default();
        match resvg::usvg::Tree::from_data(bytes, &options) {
            Ok(tree) => Some(Badge::Vector(tree)),
            Err(e) => {
                tracing::warn!("Failed to parse SVG watermark: {}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "svg"))]
    fn from_svg(bytes: &[u8]) -> Option<Self> {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        if head.contains("<svg") {
            tracing::warn!("SVG rasterization unavailable, skipping watermark");
        }
        None
    }

    /// Renders the badge `width` pixels wide, preserving its aspect ratio.
    pub fn render(&self, width: u32) -> Option<RgbaImage> {
        if width == 0 {
            return None;
        }
        match self {
            Badge::Raster(raster) => {
                if raster.width() == 0 {
                    return None;
                }
                let height =
                    (u64::from(raster.height()) * u64::from(width) / u64::from(raster.width()))
                        as u32;
                if height == 0 {
                    return None;
                }
                Some(image::imageops::resize(
                    raster,
                    width,
                    height,
                    FilterType::Triangle,
                ))
            }
            #[cfg(feature = "svg")]
            Badge::Vector(tree) => render_svg(tree, width),
        }
    }
}

#[cfg(feature = "svg")]
fn render_svg(tree: &resvg::usvg::Tree, width: u32) -> Option<RgbaImage> {
    use resvg::tiny_skia::{Pixmap, Transform};

    let size = tree.size();
    if size.width() <= 0.0 {
        return None;
    }
    let scale = width as f32 / size.width();
    let height = (size.height() * scale).floor() as u32;
    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; the compositor expects straight.
    let mut rendered = RgbaImage::new(width, height);
    for (dst, src) in rendered.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Some(rendered)
}
