//! The QR vector normalizer
//!
//! Renders a request off-screen at the working size, measures the ink
//! bounds of the encoder's primitives, and re-emits them as a flat fragment
//! projected into `[margin, size - margin]`.

use crate::encoder::{EncoderOptions, QrEncoder};
use crate::extract::{PrimitiveExtractor, RawPrimitives, RectPrimitive, StructuralExtractor};
use crate::fragment::{Shape, SvgFragment};
use crate::geometry::{InkBounds, Projection};
use crate::surface::SurfaceHost;
use crate::{Error, NormalizerConfig, QrRenderRequest, Result};
use log::{debug, info};
use std::time::Duration;

/// Turns render requests into flat, exactly-sized SVG fragments
pub struct Normalizer<E, X = StructuralExtractor> {
    encoder: E,
    extractor: X,
    config: NormalizerConfig,
    host: SurfaceHost,
}

impl<E: QrEncoder> Normalizer<E> {
    /// Normalizer reading clip-path styled markup
    pub fn new(encoder: E, config: NormalizerConfig) -> Self {
        Self::with_extractor(encoder, StructuralExtractor::new(), config)
    }
}

impl<E: QrEncoder, X: PrimitiveExtractor> Normalizer<E, X> {
    pub fn with_extractor(encoder: E, extractor: X, config: NormalizerConfig) -> Self {
        Self {
            encoder,
            extractor,
            config,
            host: SurfaceHost::new(),
        }
    }

    /// Use a shared surface host instead of a private one
    pub fn with_host(mut self, host: SurfaceHost) -> Self {
        self.host = host;
        self
    }

    pub fn host(&self) -> &SurfaceHost {
        &self.host
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Generate the SVG text for `request`
    pub async fn generate(&self, request: &QrRenderRequest) -> Result<String> {
        let fragment = self.generate_fragment(request).await?;
        let text = fragment.to_svg_string()?;
        info!(
            "generated {}px QR fragment with {} shapes ({} bytes)",
            request.size,
            fragment.shapes.len(),
            text.len()
        );
        Ok(text)
    }

    /// Generate the fragment model for `request`.
    ///
    /// The off-screen container lives for the whole call and is detached on
    /// every exit, including when the returned future is dropped.
    pub async fn generate_fragment(&self, request: &QrRenderRequest) -> Result<SvgFragment> {
        request.validate()?;

        let mut container = self.host.attach();
        let sink = container.take_sink().ok_or_else(|| {
            Error::EncoderProduceFailure(format!("container {} has no sink", container.id()))
        })?;

        let options = EncoderOptions::working(&request.url, &request.color, self.config.working_size);
        debug!("rendering in container {}: {}", container.id(), options.to_json());
        self.encoder.append(&options, sink)?;

        let rendering = container
            .wait(Duration::from_millis(self.config.settle_timeout_ms))
            .await?;
        if !rendering.svg.contains("<svg") {
            return Err(Error::EncoderProduceFailure(format!(
                "container {} holds no <svg> element",
                container.id()
            )));
        }

        let primitives = self.extractor.extract(&rendering.svg)?;
        let footprint = rendering
            .corner_footprint
            .unwrap_or(self.config.corner_footprint);
        let bounds = InkBounds::measure(&primitives, footprint)
            .ok_or_else(|| Error::EmptyGeometry("no primitives to measure".to_string()))?;
        let projection = Projection::fit(&bounds, request.size, request.margin)?;

        Ok(rewrite(&primitives, &projection, request))
    }
}

/// Re-emit every primitive in target space: module rects, then finder
/// paths, then alignment-dot rects.
fn rewrite(primitives: &RawPrimitives, projection: &Projection, request: &QrRenderRequest) -> SvgFragment {
    let mut fragment = SvgFragment::new(request.size);
    let rect = |r: &RectPrimitive| {
        let (x, y, width, height) = projection.apply_rect(r);
        Shape::Rect {
            x,
            y,
            width,
            height,
            fill: request.color.clone(),
        }
    };

    fragment.shapes.extend(primitives.modules.iter().map(rect));
    fragment.shapes.extend(primitives.finders.iter().map(|f| Shape::Path {
        d: f.d.clone(),
        fill: request.color.clone(),
        offset_x: projection.offset_x,
        offset_y: projection.offset_y,
        scale: projection.scale,
    }));
    fragment.shapes.extend(primitives.alignment_dots.iter().map(rect));
    fragment
}
