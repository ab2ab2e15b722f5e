//! QR Vector
//!
//! Turns a QR code request (target URL, color, pixel size, margin) into a
//! clean SVG fragment of exactly the requested size, ready to be parsed into
//! native vector shapes by a design host.
//!
//! # Features
//!
//! - **Styled encoder** (default): a built-in encoder on the `qrcode` crate
//!   that emits the clip-path based SVG layout common to browser QR stylers
//! - **Pluggable encoders**: any [`QrEncoder`] plus [`PrimitiveExtractor`]
//!   pair can feed the normalizer
//! - **Self-contained output**: only `<rect>` and `<path>` elements with
//!   literal fills; no `<defs>`, clip-paths, or external references
//!
//! # Example
//!
//! ```no_run
//! use qrvector::{Normalizer, NormalizerConfig, QrRenderRequest, StyledQrEncoder};
//!
//! # async fn run() -> qrvector::Result<()> {
//! let normalizer = Normalizer::new(StyledQrEncoder::new(), NormalizerConfig::default());
//! let request = QrRenderRequest {
//!     url: "https://wo.studio".to_string(),
//!     color: "#000000".to_string(),
//!     size: 150,
//!     margin: 10,
//! };
//! let svg = normalizer.generate(&request).await?;
//! assert!(svg.starts_with("<svg"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod encoder;
pub mod extract;
pub mod fragment;
pub mod geometry;
pub mod normalizer;
pub mod session;
pub mod settings;
pub mod surface;

pub use encoder::{EncoderOptions, QrEncoder};
#[cfg(feature = "styled")]
pub use encoder::styled::StyledQrEncoder;
pub use extract::{PrimitiveExtractor, RawPrimitives, StructuralExtractor};
pub use fragment::{Shape, SvgFragment};
pub use geometry::{InkBounds, Projection};
pub use normalizer::Normalizer;
pub use surface::{OffscreenContainer, RawRendering, SurfaceHost, SurfaceSink};

/// Side length of the finder-pattern glyph on a 300-unit working canvas.
///
/// Only used when the encoder does not declare its own corner footprint.
/// Coupled to [`DEFAULT_WORKING_SIZE`]: recalibrate both together.
pub const DEFAULT_CORNER_FOOTPRINT: f64 = 28.0;

/// Side length of the oversized canvas the encoder renders into
pub const DEFAULT_WORKING_SIZE: u32 = 300;

/// A request for one rendered QR fragment
///
/// The same record is what gets persisted as the user's last-used settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrRenderRequest {
    /// Data to encode, usually a URL
    pub url: String,
    /// CSS color used for every filled shape
    pub color: String,
    /// Side of the target square in pixels
    pub size: u32,
    /// Inset from every edge in pixels
    pub margin: u32,
}

impl QrRenderRequest {
    /// Check the request invariants: non-empty url, positive size, and a
    /// drawable region that does not collapse (`margin * 2 < size`).
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::InvalidRequest("url must not be empty".to_string()));
        }
        if self.size == 0 {
            return Err(Error::InvalidRequest("size must be greater than zero".to_string()));
        }
        if u64::from(self.margin) * 2 >= u64::from(self.size) {
            return Err(Error::InvalidRequest(format!(
                "margin {} leaves no drawable area in a {}px square",
                self.margin, self.size
            )));
        }
        Ok(())
    }

    /// Side of the drawable square (`size - 2 * margin`)
    pub fn drawable(&self) -> f64 {
        f64::from(self.size) - f64::from(self.margin) * 2.0
    }
}

/// Configuration for the normalizer
///
/// # Examples
///
/// ```
/// let cfg = qrvector::NormalizerConfig::default();
/// assert_eq!(cfg.working_size, 300);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Canvas side the encoder renders at, independent of the requested size
    pub working_size: u32,
    /// Upper bound on waiting for the encoder to populate its surface
    pub settle_timeout_ms: u64,
    /// Fallback finder-pattern footprint in encoder units
    pub corner_footprint: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            working_size: DEFAULT_WORKING_SIZE,
            settle_timeout_ms: 250,
            corner_footprint: DEFAULT_CORNER_FOOTPRINT,
        }
    }
}
