//! Flattened output fragment and its canonical text form

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// One re-emitted primitive in target coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Module or alignment-dot rectangle, already transformed
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: String,
    },
    /// Finder-pattern path in encoder coordinates plus the transform placing it
    Path {
        d: String,
        fill: String,
        offset_x: f64,
        offset_y: f64,
        scale: f64,
    },
}

/// A self-contained `size` x `size` SVG made only of rects and paths
#[derive(Debug, Clone, PartialEq)]
pub struct SvgFragment {
    pub size: u32,
    pub shapes: Vec<Shape>,
}

impl SvgFragment {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            shapes: Vec::new(),
        }
    }

    pub fn rects(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| matches!(s, Shape::Rect { .. }))
    }

    pub fn paths(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| matches!(s, Shape::Path { .. }))
    }

    /// Serialize to the handoff markup.
    ///
    /// The result never carries an XML prolog, XLink declarations,
    /// `<defs>` or clip-path references.
    pub fn to_svg_string(&self) -> Result<String> {
        let mut out = String::new();
        write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}" viewBox="0 0 {s} {s}">"#,
            s = self.size
        )?;
        for shape in &self.shapes {
            match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    fill,
                } => write!(
                    out,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                    num(*x)?,
                    num(*y)?,
                    num(*width)?,
                    num(*height)?,
                    escape_attr(fill)
                )?,
                Shape::Path {
                    d,
                    fill,
                    offset_x,
                    offset_y,
                    scale,
                } => write!(
                    out,
                    r#"<path d="{}" fill="{}" fill-rule="evenodd" transform="translate({},{}) scale({})"/>"#,
                    escape_attr(d),
                    escape_attr(fill),
                    num(*offset_x)?,
                    num(*offset_y)?,
                    num(*scale)?
                )?,
            }
        }
        out.push_str("</svg>");

        let out = strip_xml_artifacts(&out);
        if out.contains("clip-path") || out.contains("<defs") {
            return Err(Error::SerializationFailure(
                "fragment still references clip-path definitions".to_string(),
            ));
        }
        Ok(out)
    }

    /// Hex SHA-256 of the serialized fragment
    pub fn digest(&self) -> Result<String> {
        let text = self.to_svg_string()?;
        Ok(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// `data:` URL suitable for an `<img>` preview
    pub fn to_data_url(&self) -> Result<String> {
        let text = self.to_svg_string()?;
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(text.as_bytes())))
    }
}

fn num(v: f64) -> Result<f64> {
    if !v.is_finite() {
        return Err(Error::SerializationFailure(format!("non-finite coordinate {}", v)));
    }
    // -0 would print as "-0"
    Ok(if v == 0.0 { 0.0 } else { v })
}

/// Escape XML special characters for attribute values
pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Remove XML prologs, `xmlns:xlink` declarations and `xlink:` prefixes.
pub fn strip_xml_artifacts(svg: &str) -> String {
    let mut text = svg.to_string();

    while let Some(start) = text.find("<?xml") {
        let end = match text[start..].find("?>") {
            Some(rel) => start + rel + 2,
            None => text.len(),
        };
        let tail = text[end..].trim_start().to_string();
        text.truncate(start);
        text.push_str(&tail);
    }

    while let Some(start) = text.find("xmlns:xlink=\"") {
        let value_start = start + "xmlns:xlink=\"".len();
        let end = match text[value_start..].find('"') {
            Some(rel) => value_start + rel + 1,
            None => text.len(),
        };
        let start = if text[..start].ends_with(' ') { start - 1 } else { start };
        text.replace_range(start..end, "");
    }

    text.replace("xlink:", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SvgFragment {
        SvgFragment {
            size: 100,
            shapes: vec![
                Shape::Rect {
                    x: 10.0,
                    y: 12.5,
                    width: 5.0,
                    height: 5.0,
                    fill: "#000000".to_string(),
                },
                Shape::Path {
                    d: "M 0 0h 7v 7h -7z".to_string(),
                    fill: "#000000".to_string(),
                    offset_x: -0.0,
                    offset_y: 4.0,
                    scale: 0.5,
                },
            ],
        }
    }

    #[test]
    fn serializes_flat_rects_and_paths() {
        let text = sample().to_svg_string().unwrap();
        assert_eq!(
            text,
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100" viewBox="0 0 100 100">"#,
                r##"<rect x="10" y="12.5" width="5" height="5" fill="#000000"/>"##,
                r##"<path d="M 0 0h 7v 7h -7z" fill="#000000" fill-rule="evenodd" transform="translate(0,4) scale(0.5)"/>"##,
                "</svg>"
            )
        );
    }

    #[test]
    fn fill_values_are_escaped() {
        let mut f = SvgFragment::new(10);
        f.shapes.push(Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            fill: "\"><script>".to_string(),
        });
        let text = f.to_svg_string().unwrap();
        assert!(text.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn non_finite_coordinates_fail_serialization() {
        let mut f = SvgFragment::new(10);
        f.shapes.push(Shape::Rect {
            x: f64::NAN,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            fill: "#000".to_string(),
        });
        assert!(matches!(f.to_svg_string(), Err(Error::SerializationFailure(_))));
    }

    #[test]
    fn strips_prolog_and_xlink() {
        let raw = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\"><use xlink:href=\"#a\"/></svg>";
        assert_eq!(
            strip_xml_artifacts(raw),
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><use href=\"#a\"/></svg>"
        );
    }

    #[test]
    fn digest_and_data_url_are_stable() {
        let f = sample();
        assert_eq!(f.digest().unwrap(), f.clone().digest().unwrap());
        assert_eq!(f.digest().unwrap().len(), 64);
        assert!(f.to_data_url().unwrap().starts_with("data:image/svg+xml;base64,PHN2Zy"));
    }
}
