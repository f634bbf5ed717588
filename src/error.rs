/// Errors returned by the encoding path and by session setup.
///
/// Per-frame decode misses are not errors; they surface as
/// [`ScanResult::NoResult`](crate::decode::ScanResult::NoResult).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("payload too large: {bits} bits needed, capacity is {capacity} bits")]
    PayloadTooLarge { bits: usize, capacity: usize },
    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject zero-sized grids before anything is allocated.
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}
