use crate::bitraster::BitMatrix;
use crate::error::{check_dimensions, Error, Result};

use base64::Engine;
use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const BLACK: Luma<u8> = Luma([0u8]);
const WHITE: Luma<u8> = Luma([255u8]);

/// A rendered bit raster: one pixel per cell, black for 1 and white for 0.
///
/// The image is self-contained and owned by whoever holds it.
#[derive(Clone, PartialEq, Debug)]
pub struct RasterImage {
    pixels: GrayImage,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether the pixel at (`x`, `y`) is painted black.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] == 0
    }

    pub fn black_pixels(&self) -> usize {
        self.pixels.pixels().filter(|p| p[0] == 0).count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }

    /// Encodes the image as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Encodes the image as a `data:image/png;base64,...` URL, ready for an
    /// `<img src>` attribute.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png_bytes()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        Ok(format!("data:image/png;base64,{encoded}"))
    }

    /// Saves the image; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.pixels.save(path)?;
        Ok(())
    }
}

/// Renders `matrix` into a `width x height` image on a white background.
///
/// Pixel (x, y) is black when cell `[row = y][col = x]` is 1, so the image
/// reads in the same row-major order the payload was written in.
///
/// # Errors
///
/// Returns [`Error::InvalidDimensions`] if either dimension is zero or the
/// size does not match the matrix.
pub fn render(matrix: &BitMatrix, width: u32, height: u32) -> Result<RasterImage> {
    check_dimensions(width, height)?;
    if matrix.cols() != width || matrix.rows() != height {
        return Err(Error::InvalidDimensions { width, height });
    }

    let mut img = ImageBuffer::from_pixel(width, height, WHITE);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if matrix.get(y, x) {
            *pixel = BLACK;
        }
    }
    Ok(RasterImage { pixels: img })
}

/*---- Utilities ----*/

// Returns a string of SVG code for an image depicting the given matrix,
// with the given number of white border cells.
// The string always uses Unix newlines (\n), regardless of the platform.
pub fn to_svg_string(matrix: &BitMatrix, border: u32) -> String {
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
    let width = matrix.cols() + border * 2;
    let height = matrix.rows() + border * 2;
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" viewBox=\"0 0 {width} {height}\" stroke=\"none\">\n"
    );
    result += "\t<rect width=\"100%\" height=\"100%\" fill=\"#FFFFFF\"/>\n";
    result += "\t<path d=\"";
    let mut first = true;
    for y in 0..matrix.rows() {
        for x in 0..matrix.cols() {
            if matrix.get(y, x) {
                if !first {
                    result += " ";
                }
                first = false;
                result += &format!("M{},{}h1v1h-1z", x + border, y + border);
            }
        }
    }
    result += "\" fill=\"#000000\"/>\n";
    result += "</svg>\n";
    result
}

/// Block-art rendering of a matrix, two characters per cell, with a
/// two-cell quiet border.
pub fn to_console_string(matrix: &BitMatrix) -> String {
    let border: i64 = 2;
    let mut out = String::new();
    for y in -border..i64::from(matrix.rows()) + border {
        for x in -border..i64::from(matrix.cols()) + border {
            let dark = x >= 0 && y >= 0 && matrix.get(y as u32, x as u32);
            out.push_str(if dark { "██" } else { "  " });
        }
        out.push('\n');
    }
    out
}

/// Prints the given matrix to the console.
pub fn print_matrix(matrix: &BitMatrix) {
    println!("{}", to_console_string(matrix));
}

/// Saves a rendered image as PNG and returns the path written.
///
/// # Arguments
///
/// * `image` - The rendered image.
/// * `directory_path` - Optional. Target directory, created if missing. Defaults to "generated".
/// * `filename` - Optional. File name without extension. Defaults to a timestamp.
pub fn save_png(
    image: &RasterImage,
    directory_path: Option<&str>,
    filename: Option<&str>,
) -> Result<PathBuf> {
    let directory_path = directory_path.unwrap_or("generated");
    let filename = match filename {
        Some(name) => name.to_string(),
        None => {
            let since_the_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            since_the_epoch.as_millis().to_string()
        }
    };

    if !Path::new(directory_path).exists() {
        fs::create_dir_all(directory_path)?;
    }

    let file_path = Path::new(directory_path).join(format!("{filename}.png"));
    image.save(&file_path)?;
    Ok(file_path)
}
