//! Encoder capability: anything that can draw a QR symbol into a surface
//!
//! The normalizer only knows this interface. Swapping the encoder means
//! implementing [`QrEncoder`] and, when its markup differs, a matching
//! [`crate::PrimitiveExtractor`].

use crate::surface::SurfaceSink;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

#[cfg(feature = "styled")]
pub mod styled;

/// Output kind requested from the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Svg,
    Canvas,
}

/// Shape style for dots and corner glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Square,
    Dots,
    ExtraRounded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeStyle {
    pub color: String,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
}

impl ShapeStyle {
    pub fn square(color: &str) -> Self {
        Self {
            color: color.to_string(),
            kind: ShapeKind::Square,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundStyle {
    pub color: String,
}

/// Options handed to an encoder, shaped like the browser styler's options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderOptions {
    pub width: u32,
    pub height: u32,
    pub data: String,
    pub margin: u32,
    #[serde(rename = "type")]
    pub output: OutputType,
    pub dots_options: ShapeStyle,
    pub corners_square_options: ShapeStyle,
    pub corners_dot_options: ShapeStyle,
    pub background_options: BackgroundStyle,
}

impl EncoderOptions {
    /// Options for an off-screen working render: square styling in `color`,
    /// zero margin, transparent background, vector output.
    pub fn working(data: &str, color: &str, working_size: u32) -> Self {
        Self {
            width: working_size,
            height: working_size,
            data: data.to_string(),
            margin: 0,
            output: OutputType::Svg,
            dots_options: ShapeStyle::square(color),
            corners_square_options: ShapeStyle::square(color),
            corners_dot_options: ShapeStyle::square(color),
            background_options: BackgroundStyle {
                color: "transparent".to_string(),
            },
        }
    }

    /// JSON form, for logs
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An encoder that populates an off-screen surface.
///
/// `append` may complete the sink synchronously or hand it to background
/// work; the caller waits on the container either way. Returning an error
/// means nothing will ever be written.
pub trait QrEncoder: Send + Sync {
    fn append(&self, options: &EncoderOptions, sink: SurfaceSink) -> Result<()>;
}

impl<T: QrEncoder + ?Sized> QrEncoder for Arc<T> {
    fn append(&self, options: &EncoderOptions, sink: SurfaceSink) -> Result<()> {
        (**self).append(options, sink)
    }
}

impl<T: QrEncoder + ?Sized> QrEncoder for Box<T> {
    fn append(&self, options: &EncoderOptions, sink: SurfaceSink) -> Result<()> {
        (**self).append(options, sink)
    }
}
