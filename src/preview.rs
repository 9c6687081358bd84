// Preview module for rendering image thumbnails
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::{self, Cursor};
use std::path::Path;

/// Bounding box a thumbnail is scaled to fit, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Size used for the fast first pass
    pub fn degraded(self) -> Self {
        Self::new((self.width / 4).max(1), (self.height / 4).max(1))
    }
}

/// An encoded thumbnail image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// PNG-encoded image data
    pub bytes: Vec<u8>,
}

/// How much effort to spend on a thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailQuality {
    /// Nearest-neighbour at a quarter of the target size
    Degraded,
    Final,
}

/// Loads an image from a file path
pub fn load_image(path: &Path) -> io::Result<DynamicImage> {
    image::open(path).map_err(|e| io::Error::other(format!("Image loading error: {}", e)))
}

/// Calculates new dimensions to fit image within max width and height while preserving aspect ratio
pub fn calculate_resize_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if original_width == 0 || original_height == 0 {
        return (0, 0);
    }

    let width_ratio = max_width as f64 / original_width as f64;
    let height_ratio = max_height as f64 / original_height as f64;

    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        // Never upscale
        (original_width, original_height)
    } else {
        // Extreme aspect ratios must not collapse to an empty image
        let new_width = ((original_width as f64 * ratio) as u32).max(1);
        let new_height = ((original_height as f64 * ratio) as u32).max(1);
        (new_width, new_height)
    }
}

/// Scales an image to fit `target` and encodes it as PNG
pub fn render_thumbnail(
    img: &DynamicImage,
    target: ThumbnailSize,
    quality: ThumbnailQuality,
) -> io::Result<Thumbnail> {
    let (bounds, filter) = match quality {
        ThumbnailQuality::Degraded => (target.degraded(), FilterType::Nearest),
        // Lanczos3 is too slow for full-resolution screenshots
        ThumbnailQuality::Final => (target, FilterType::Triangle),
    };

    let (orig_width, orig_height) = img.dimensions();
    let (width, height) =
        calculate_resize_dimensions(orig_width, orig_height, bounds.width, bounds.height);
    if width == 0 || height == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Image has no pixels",
        ));
    }

    let scaled = if (width, height) == (orig_width, orig_height) {
        img.clone()
    } else {
        img.resize_exact(width, height, filter)
    };

    let mut bytes = Vec::new();
    scaled
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| io::Error::other(format!("Thumbnail encoding error: {}", e)))?;

    Ok(Thumbnail {
        width,
        height,
        bytes,
    })
}
