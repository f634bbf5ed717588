//! # rasterqr
//!
//! Render text as a scannable bit-raster image, and recover text from
//! camera frames.
//!
//! The generation side lays the UTF-8 bytes of a string into a fixed grid,
//! one bit per cell in row-major order, and paints the grid as a
//! black-on-white image. The scanning side samples frames from a video
//! source on a fixed period and hands each one to a decoder, reporting a
//! [`ScanResult`] per tick.
//!
//! The raster is a plain bit layout, not a QR symbol: it has no finder
//! patterns, format information or error correction. Standard QR symbols can
//! still be scanned through [`QrDecoder`].
//!
//! ## Example
//!
//! Generate an image and read it back:
//!
//! ```rust
//! use rasterqr::{generate, EncodeOptions, LuminanceFrame, PayloadDecoder, RasterDecoder, ScanResult};
//!
//! let options = EncodeOptions::new(64, 8);
//! let image = generate("Hello, World!", &options).unwrap();
//!
//! let gray = image.as_gray();
//! let frame = LuminanceFrame::from_luma(gray.width(), gray.height(), gray.as_raw()).unwrap();
//! let mut decoder = PayloadDecoder::new(RasterDecoder::new(64, 8));
//! assert_eq!(decoder.decode(&frame), ScanResult::Text("Hello, World!".into()));
//! ```
//!
//! Scan a video source:
//!
//! ```rust,no_run
//! use rasterqr::{QrDecoder, ScanConfig, ScanLoop, StillSource};
//!
//! # async fn run() -> rasterqr::Result<()> {
//! let mut scanner = ScanLoop::new(QrDecoder, ScanConfig::default())?;
//! let video = StillSource::open("code.png")?;
//! let session = scanner.start(video, |result| {
//!     if let Some(text) = result.text() {
//!         println!("Scanned: {text}");
//!     }
//! });
//! # session.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`bitraster`]: text to bit matrix and back.
//! - [`render`]: bit matrix to image, SVG or console art.
//! - [`generator`]: the one-call text to image facade and its options.
//! - [`frame`]: video sources and frame sampling.
//! - [`decode`]: decoders and the per-frame result type.
//! - [`scan`]: the periodic scan loop and its sessions.

#![forbid(unsafe_code)]

pub mod bitraster;
pub mod decode;
pub mod error;
pub mod frame;
pub mod generator;
pub mod logger;
pub mod render;
pub mod scan;

pub use bitraster::BitMatrix;
pub use decode::{Decode, DecodeFailure, PayloadDecoder, QrDecoder, RasterDecoder, ScanResult};
pub use error::{Error, Result};
pub use frame::{FrameSampler, LuminanceFrame, StillSource, VideoSource};
pub use generator::{
    generate, EncodeOptions, ErrorCorrectionLevel, OutputFormat, OverflowPolicy,
};
pub use render::RasterImage;
pub use scan::{CameraProvider, ScanConfig, ScanLoop, ScanState, SessionHandle};
