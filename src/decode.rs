//! Recovering a text payload from a sampled frame.
//!
//! Most frames in a live scan contain nothing decodable, so a miss is an
//! ordinary outcome: [`PayloadDecoder`] turns every failure of the
//! underlying [`Decode`] capability into [`ScanResult::NoResult`].

use crate::bitraster::{self, BitMatrix};
use crate::frame::LuminanceFrame;

/// Outcome of one decode attempt.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ScanResult {
    Text(String),
    NoResult,
}

impl ScanResult {
    pub fn text(&self) -> Option<&str> {
        match self {
            ScanResult::Text(text) => Some(text),
            ScanResult::NoResult => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ScanResult::Text(_))
    }
}

/// Why a decoder found nothing in a frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("no symbol found")]
    NotFound,
    #[error("symbol could not be read: {0}")]
    Malformed(String),
}

/// A symbol reader: given a frame, return the embedded text or say why not.
pub trait Decode: Send {
    fn decode(&mut self, frame: &LuminanceFrame) -> Result<String, DecodeFailure>;
}

impl<F> Decode for F
where
    F: FnMut(&LuminanceFrame) -> Result<String, DecodeFailure> + Send,
{
    fn decode(&mut self, frame: &LuminanceFrame) -> Result<String, DecodeFailure> {
        self(frame)
    }
}

/// Adapts a [`Decode`] capability to the [`ScanResult`] contract.
#[derive(Debug, Clone, Default)]
pub struct PayloadDecoder<D> {
    inner: D,
}

impl<D: Decode> PayloadDecoder<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn decode(&mut self, frame: &LuminanceFrame) -> ScanResult {
        match self.inner.decode(frame) {
            Ok(text) => ScanResult::Text(text),
            Err(failure) => {
                log::trace!(
                    "no payload in {}x{} frame: {failure}",
                    frame.width(),
                    frame.height()
                );
                ScanResult::NoResult
            }
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }
}

/// Reads standard QR symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl Decode for QrDecoder {
    fn decode(&mut self, frame: &LuminanceFrame) -> Result<String, DecodeFailure> {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        let grey = frame.to_luma();
        let mut img = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| grey[y * w + x]);
        let grids = img.detect_grids();
        let grid = grids.first().ok_or(DecodeFailure::NotFound)?;
        let (_meta, content) = grid
            .decode()
            .map_err(|e| DecodeFailure::Malformed(format!("{e:?}")))?;
        Ok(content)
    }
}

/// Reads the bit raster written by [`bitraster::encode`] back out of a
/// frame.
///
/// The frame is assumed to show the whole grid edge to edge. Each cell is
/// sampled at its centre and called dark if its luminance falls at or below
/// an Otsu threshold computed over the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterDecoder {
    pub width: u32,
    pub height: u32,
}

impl RasterDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Samples the frame into a `height x width` matrix.
    pub fn sample_matrix(&self, frame: &LuminanceFrame) -> Result<BitMatrix, DecodeFailure> {
        let grey = frame.to_luma();
        let threshold = otsu_threshold(&grey).ok_or(DecodeFailure::NotFound)?;
        let mut matrix = BitMatrix::new(self.height, self.width)
            .map_err(|e| DecodeFailure::Malformed(e.to_string()))?;

        let fw = frame.width() as usize;
        let fh = frame.height() as usize;
        let rows = self.height as usize;
        let cols = self.width as usize;
        for row in 0..self.height {
            let y = (2 * row as usize + 1) * fh / (2 * rows);
            for col in 0..self.width {
                let x = (2 * col as usize + 1) * fw / (2 * cols);
                if grey[y * fw + x] <= threshold {
                    matrix.set(row, col, true);
                }
            }
        }
        Ok(matrix)
    }
}

impl Decode for RasterDecoder {
    fn decode(&mut self, frame: &LuminanceFrame) -> Result<String, DecodeFailure> {
        let matrix = self.sample_matrix(frame)?;
        let bytes = bitraster::read_bytes(&matrix);
        if bytes.is_empty() {
            return Err(DecodeFailure::NotFound);
        }
        String::from_utf8(bytes).map_err(|e| DecodeFailure::Malformed(e.to_string()))
    }
}

/// Otsu threshold over a set of luminance samples.
///
/// `None` when the samples carry no contrast at all.
fn otsu_threshold(samples: &[u8]) -> Option<u8> {
    let min_v = *samples.iter().min()?;
    let max_v = *samples.iter().max()?;
    if min_v == max_v {
        return None;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return Some(((min_v as u16 + max_v as u16) / 2) as u8);
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    Some(best_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, EncodeOptions};
    use image::imageops::{resize, FilterType};

    fn frame_of(img: &image::GrayImage) -> LuminanceFrame {
        LuminanceFrame::from_luma(img.width(), img.height(), img.as_raw()).unwrap()
    }

    #[test]
    fn test_failure_maps_to_no_result() {
        let mut decoder = PayloadDecoder::new(|_: &LuminanceFrame| -> Result<String, DecodeFailure> {
            Err(DecodeFailure::Malformed("bad".into()))
        });
        let frame = LuminanceFrame::from_luma(1, 1, &[0]).unwrap();
        assert_eq!(decoder.decode(&frame), ScanResult::NoResult);
    }

    #[test]
    fn test_success_maps_to_text() {
        let mut decoder = PayloadDecoder::new(|_: &LuminanceFrame| -> Result<String, DecodeFailure> {
            Ok("hello".to_string())
        });
        let frame = LuminanceFrame::from_luma(1, 1, &[0]).unwrap();
        let result = decoder.decode(&frame);
        assert_eq!(result.text(), Some("hello"));
        assert!(result.is_text());
    }

    #[test]
    fn test_raster_decoder_reads_rendered_image() {
        let img = generate("Hello", &EncodeOptions::new(16, 4)).unwrap();
        let mut decoder = RasterDecoder::new(16, 4);
        assert_eq!(decoder.decode(&frame_of(img.as_gray())).unwrap(), "Hello");
    }

    #[test]
    fn test_raster_decoder_reads_upscaled_image() {
        let img = generate("scan me", &EncodeOptions::new(8, 8)).unwrap();
        let big = resize(img.as_gray(), 80, 80, FilterType::Nearest);
        let mut decoder = PayloadDecoder::new(RasterDecoder::new(8, 8));
        assert_eq!(
            decoder.decode(&frame_of(&big)),
            ScanResult::Text("scan me".to_string())
        );
    }

    #[test]
    fn test_raster_decoder_blank_frame() {
        let blank = image::GrayImage::from_pixel(10, 10, image::Luma([255]));
        let mut decoder = RasterDecoder::new(10, 10);
        assert_eq!(decoder.decode(&frame_of(&blank)), Err(DecodeFailure::NotFound));
    }

    #[test]
    fn test_qr_decoder_blank_frame() {
        let blank = image::GrayImage::from_pixel(64, 64, image::Luma([255]));
        let mut decoder = PayloadDecoder::new(QrDecoder);
        assert_eq!(decoder.decode(&frame_of(&blank)), ScanResult::NoResult);
    }

    #[test]
    fn test_otsu_threshold() {
        assert_eq!(otsu_threshold(&[]), None);
        assert_eq!(otsu_threshold(&[9, 9, 9]), None);
        assert_eq!(otsu_threshold(&[0, 255, 0]), Some(127));
        let t = otsu_threshold(&[10, 12, 11, 200, 210, 205]).unwrap();
        assert!((12..200).contains(&t));
    }
}
