#![cfg(feature = "styled")]

use std::sync::Arc;

use qrvector::extract::FinderPath;
use qrvector::{
    EncoderOptions, Normalizer, NormalizerConfig, PrimitiveExtractor, QrRenderRequest, Shape,
    StructuralExtractor, StyledQrEncoder, SvgFragment,
};

const TOLERANCE: f64 = 0.01;

fn request(url: &str, color: &str, size: u32, margin: u32) -> QrRenderRequest {
    QrRenderRequest {
        url: url.to_string(),
        color: color.to_string(),
        size,
        margin,
    }
}

fn declared_footprint(url: &str) -> f64 {
    let opts = EncoderOptions::working(url, "#000000", qrvector::DEFAULT_WORKING_SIZE);
    StyledQrEncoder::new()
        .render_svg(&opts)
        .unwrap()
        .corner_footprint
        .unwrap()
}

/// Union of every emitted shape's extent in output coordinates
fn emitted_bounds(fragment: &SvgFragment, footprint: f64) -> (f64, f64, f64, f64) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for shape in &fragment.shapes {
        let (x0, y0, x1, y1) = match shape {
            Shape::Rect {
                x, y, width, height, ..
            } => (*x, *y, x + width, y + height),
            Shape::Path {
                d,
                offset_x,
                offset_y,
                scale,
                ..
            } => {
                let (ax, ay) = FinderPath::new(d.clone()).anchor().unwrap();
                let x = ax * scale + offset_x;
                let y = ay * scale + offset_y;
                (x, y, x + footprint * scale, y + footprint * scale)
            }
        };
        min_x = min_x.min(x0);
        min_y = min_y.min(y0);
        max_x = max_x.max(x1);
        max_y = max_y.max(y1);
    }
    (min_x, min_y, max_x, max_y)
}

#[tokio::test]
async fn output_fits_the_drawable_square_for_many_requests() {
    let normalizer = Normalizer::new(StyledQrEncoder::new(), NormalizerConfig::default());
    let url = "https://wo.studio";
    let footprint = declared_footprint(url);

    for (size, margin) in [(150, 0), (150, 10), (64, 3), (512, 40), (33, 16), (1000, 1)] {
        let fragment = normalizer
            .generate_fragment(&request(url, "#000000", size, margin))
            .await
            .unwrap();
        let svg = fragment.to_svg_string().unwrap();
        assert!(svg.contains(&format!(
            r#"width="{s}" height="{s}" viewBox="0 0 {s} {s}""#,
            s = size
        )));

        let (min_x, min_y, max_x, max_y) = emitted_bounds(&fragment, footprint);
        let lo = f64::from(margin);
        let hi = f64::from(size - margin);
        for v in [min_x, min_y] {
            assert!((v - lo).abs() < TOLERANCE, "{} vs margin {} at size {}", v, lo, size);
        }
        for v in [max_x, max_y] {
            assert!((v - hi).abs() < TOLERANCE, "{} vs {} at size {}", v, hi, size);
        }
        // centered: both gaps agree
        assert!(((min_x - lo) - (hi - max_x)).abs() < TOLERANCE);
        assert!(((min_y - lo) - (hi - max_y)).abs() < TOLERANCE);
    }
    assert_eq!(normalizer.host().live_containers(), 0);
}

#[tokio::test]
async fn every_shape_is_filled_with_the_request_color() {
    let normalizer = Normalizer::new(StyledQrEncoder::new(), NormalizerConfig::default());
    let f = normalizer
        .generate_fragment(&request("https://example.com/a/longer/path?q=1", "rgb(10, 20, 30)", 200, 12))
        .await
        .unwrap();

    assert_eq!(f.paths().count(), 3);
    assert_eq!(f.rects().count(), f.shapes.len() - 3);
    for shape in &f.shapes {
        let fill = match shape {
            Shape::Rect { fill, .. } | Shape::Path { fill, .. } => fill,
        };
        assert_eq!(fill, "rgb(10, 20, 30)");
    }
}

#[tokio::test]
async fn repeated_generation_is_byte_identical() {
    let normalizer = Normalizer::new(StyledQrEncoder::new(), NormalizerConfig::default());
    let req = request("https://wo.studio", "#000000", 150, 10);
    let a = normalizer.generate(&req).await.unwrap();
    let b = normalizer.generate(&req).await.unwrap();
    assert_eq!(a, b);
    for banned in ["clip-path", "<defs", "<?xml", "xlink"] {
        assert!(!a.contains(banned));
    }
}

#[tokio::test]
async fn overlapping_requests_stay_isolated() {
    let normalizer = Arc::new(Normalizer::new(StyledQrEncoder::new(), NormalizerConfig::default()));
    let colors = ["#ff0000", "#00ff00", "#0000ff", "#123456"];

    let mut tasks = Vec::new();
    for (i, color) in colors.iter().enumerate() {
        let n = Arc::clone(&normalizer);
        let req = request(&format!("https://wo.studio/{}", i), color, 120 + i as u32, 5);
        tasks.push(tokio::spawn(async move { (req.color.clone(), n.generate(&req).await) }));
    }

    for task in tasks {
        let (color, svg) = task.await.unwrap();
        let svg = svg.unwrap();
        assert!(svg.contains(&format!("fill=\"{}\"", color)));
        for other in colors.iter().filter(|c| **c != color) {
            assert!(!svg.contains(other));
        }
    }
    assert_eq!(normalizer.host().live_containers(), 0);
}

#[test]
fn styled_markup_extracts_three_finders_and_three_dots() {
    let opts = EncoderOptions::working("https://wo.studio", "#000000", 300);
    let raw = StyledQrEncoder::new().render_svg(&opts).unwrap();
    let p = StructuralExtractor::new().extract(&raw.svg).unwrap();
    assert_eq!(p.finders.len(), 3);
    assert_eq!(p.alignment_dots.len(), 3);
    assert!(!p.modules.is_empty());

    // finder anchors sit on the symbol's corners
    let footprint = raw.corner_footprint.unwrap();
    let anchors: Vec<_> = p.finders.iter().map(|f| f.anchor().unwrap()).collect();
    assert_eq!(anchors[0].1, anchors[1].1);
    assert_eq!(anchors[0].0, anchors[2].0);
    assert!(anchors[1].0 > anchors[0].0 + footprint);
}
