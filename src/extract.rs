//! Primitive extraction from raw encoder markup
//!
//! Primitive families are located by structural role, never by exact id:
//! ids containing `corners-square` hold finder paths, `corners-dot` hold
//! alignment dots, and any other `dot-color` id holds the module rects.
//! Clip-path wrappers and `<use>` references are followed to the geometry
//! they point at.

use crate::{Error, Result};
use log::{debug, warn};
use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};

/// Reference hops followed before giving up (guards against cycles)
const MAX_DEREF_DEPTH: usize = 16;

/// Axis-aligned rectangle in encoder coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Finder-pattern glyph as an opaque path description
#[derive(Debug, Clone, PartialEq)]
pub struct FinderPath {
    pub d: String,
}

impl FinderPath {
    pub fn new(d: impl Into<String>) -> Self {
        Self { d: d.into() }
    }

    /// Coordinates of the leading moveto
    pub fn anchor(&self) -> Option<(f64, f64)> {
        let trimmed = self.d.trim_start();
        let mut rest = trimmed
            .strip_prefix('M')
            .or_else(|| trimmed.strip_prefix('m'))?;
        let x = next_number(&mut rest)?;
        let y = next_number(&mut rest)?;
        Some((x, y))
    }
}

/// Scan one SVG path number off the front of `input`
fn next_number(input: &mut &str) -> Option<f64> {
    let s = input.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    let mut end = 0;
    let mut prev = None;
    let mut seen_dot = false;
    let mut seen_exp = false;
    for (i, c) in s.char_indices() {
        let accepted = match c {
            '0'..='9' => true,
            '.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            '-' | '+' => i == 0 || matches!(prev, Some('e') | Some('E')),
            'e' | 'E' if !seen_exp && i > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !accepted {
            break;
        }
        end = i + c.len_utf8();
        prev = Some(c);
    }
    let value = s[..end].parse().ok()?;
    *input = &s[end..];
    Some(value)
}

/// The three primitive families read out of one rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPrimitives {
    pub modules: Vec<RectPrimitive>,
    pub finders: Vec<FinderPath>,
    pub alignment_dots: Vec<RectPrimitive>,
}

/// Reads primitive families out of an encoder's raw markup.
pub trait PrimitiveExtractor: Send + Sync {
    fn extract(&self, svg: &str) -> Result<RawPrimitives>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Module,
    Finder,
    AlignmentDot,
}

fn classify(id: &str) -> Option<Role> {
    if id.contains("corners-square") {
        Some(Role::Finder)
    } else if id.contains("corners-dot") {
        Some(Role::AlignmentDot)
    } else if id.contains("dot-color") {
        Some(Role::Module)
    } else {
        None
    }
}

/// Extractor for clip-path based SVG stylers
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralExtractor;

impl StructuralExtractor {
    pub fn new() -> Self {
        StructuralExtractor
    }
}

impl PrimitiveExtractor for StructuralExtractor {
    fn extract(&self, svg: &str) -> Result<RawPrimitives> {
        let doc = Html::parse_fragment(svg);
        let root = doc
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| is_named(e, "svg"))
            .ok_or_else(|| {
                Error::EncoderProduceFailure("no <svg> root in encoder output".to_string())
            })?;

        let index: HashMap<&str, ElementRef<'_>> = root
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|e| e.value().id().map(|id| (id, e)))
            .collect();

        let mut primitives = RawPrimitives::default();
        let mut seen = HashSet::new();
        let mut groups = [0usize; 3];

        for group in root.descendants().filter_map(ElementRef::wrap) {
            let role = match group.value().id().and_then(classify) {
                Some(role) => role,
                None => continue,
            };

            let mut shapes = Vec::new();
            collect_geometry(group, role, &index, 0, &mut shapes);
            let mut took = false;
            for shape in shapes {
                let fits = match role {
                    Role::Finder => is_named(&shape, "path") && attr(&shape, "d").is_some(),
                    Role::Module | Role::AlignmentDot => is_named(&shape, "rect"),
                };
                // a shape only counts as seen once some group has taken it
                if !fits || !seen.insert(shape.id()) {
                    continue;
                }
                match role {
                    Role::Module => primitives.modules.push(read_rect(&shape)),
                    Role::AlignmentDot => primitives.alignment_dots.push(read_rect(&shape)),
                    Role::Finder => primitives
                        .finders
                        .push(FinderPath::new(attr(&shape, "d").unwrap_or_default())),
                }
                took = true;
            }
            if took {
                groups[role as usize] += 1;
            }
        }

        debug!(
            "extracted {} module rects, {} finder paths ({} groups), {} alignment rects ({} groups)",
            primitives.modules.len(),
            primitives.finders.len(),
            groups[Role::Finder as usize],
            primitives.alignment_dots.len(),
            groups[Role::AlignmentDot as usize]
        );

        if primitives.modules.is_empty() {
            return Err(Error::EmptyGeometry(
                "no module rectangles in encoder output".to_string(),
            ));
        }
        Ok(primitives)
    }
}

/// Walk `el` down to concrete `rect`/`path` nodes, following clip-path
/// wrappers and `<use>` references instead of taking them.
///
/// Only reference hops count against `MAX_DEREF_DEPTH`; plain nesting is
/// free. Child groups that belong to another role are left for their own
/// pass.
fn collect_geometry<'a>(
    el: ElementRef<'a>,
    role: Role,
    index: &HashMap<&str, ElementRef<'a>>,
    hops: usize,
    out: &mut Vec<ElementRef<'a>>,
) {
    if hops > MAX_DEREF_DEPTH {
        warn!(
            "dropping geometry under <{}>: more than {} reference hops",
            el.value().name(),
            MAX_DEREF_DEPTH
        );
        return;
    }

    if let Some(reference) = attr(&el, "clip-path") {
        if let Some(target) = url_ref(reference).and_then(|id| index.get(id)) {
            collect_geometry(*target, role, index, hops + 1, out);
        }
        return;
    }

    if is_named(&el, "rect") || is_named(&el, "path") {
        out.push(el);
        return;
    }

    if is_named(&el, "use") {
        let target = attr(&el, "href")
            .and_then(|h| h.trim().strip_prefix('#'))
            .and_then(|id| index.get(id));
        if let Some(target) = target {
            collect_geometry(*target, role, index, hops + 1, out);
        }
        return;
    }

    for child in el.children().filter_map(ElementRef::wrap) {
        match child.value().id().and_then(classify) {
            Some(other) if other != role => continue,
            _ => collect_geometry(child, role, index, hops, out),
        }
    }
}

fn is_named(el: &ElementRef<'_>, name: &str) -> bool {
    el.value().name().eq_ignore_ascii_case(name)
}

/// Attribute lookup by local name, so `xlink:href` answers to `href`
fn attr<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attrs()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn number(el: &ElementRef<'_>, name: &str) -> f64 {
    attr(el, name)
        .and_then(|v| v.trim().trim_end_matches("px").parse().ok())
        .unwrap_or(0.0)
}

fn read_rect(el: &ElementRef<'_>) -> RectPrimitive {
    RectPrimitive {
        x: number(el, "x"),
        y: number(el, "y"),
        width: number(el, "width"),
        height: number(el, "height"),
    }
}

/// `url('#id')`, `url("#id")` or `url(#id)` to `id`
fn url_ref(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix("url(")?
        .strip_suffix(')')?
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .strip_prefix('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLED: &str = concat!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="300" height="300"><defs>"#,
        r#"<clipPath id="clip-path-background-color"><rect x="0" y="0" width="300" height="300"/></clipPath>"#,
        r#"<clipPath id="clip-path-dot-color"><rect x="100" y="100" width="10" height="10"/><rect x="110" y="120" width="10" height="10"/></clipPath>"#,
        r#"<clipPath id="clip-path-corners-square-color-0-0"><path clip-rule="evenodd" d="M 10 10v 70h 70v -70zM 20 20h 50v 50h -50z"/></clipPath>"#,
        r#"<clipPath id="clip-path-corners-dot-color-0-0"><rect x="30" y="30" width="30" height="30"/></clipPath>"#,
        r#"</defs>"#,
        r#"<rect x="0" y="0" height="300" width="300" clip-path="url('#clip-path-dot-color')" fill="black"/>"#,
        r#"</svg>"#
    );

    #[test]
    fn extracts_all_three_families() {
        let p = StructuralExtractor::new().extract(STYLED).unwrap();
        assert_eq!(p.modules.len(), 2);
        assert_eq!(p.modules[1], RectPrimitive { x: 110.0, y: 120.0, width: 10.0, height: 10.0 });
        assert_eq!(p.finders, vec![FinderPath::new("M 10 10v 70h 70v -70zM 20 20h 50v 50h -50z")]);
        assert_eq!(p.alignment_dots, vec![RectPrimitive { x: 30.0, y: 30.0, width: 30.0, height: 30.0 }]);
    }

    #[test]
    fn follows_use_and_clip_path_indirection() {
        let svg = concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><defs>"#,
            r#"<path id="eye" d="M5,6 h7 v7 h-7 z"/>"#,
            r#"<clipPath id="dots"><rect x="40" y="40" width="4" height="4"/></clipPath>"#,
            r#"<clipPath id="corner-inner"><rect x="8" y="8" width="3" height="3"/></clipPath>"#,
            r#"</defs>"#,
            r#"<g id="qr-dot-color-v2"><rect width="100" height="100" clip-path="url(#dots)"/></g>"#,
            r##"<g id="qr-corners-square-a"><use xlink:href="#eye"/></g>"##,
            r##"<g id="qr-corners-dot-a"><rect width="100" height="100" clip-path='url("#corner-inner")'/></g>"##,
            r#"</svg>"#
        );
        let p = StructuralExtractor::new().extract(svg).unwrap();
        assert_eq!(p.modules, vec![RectPrimitive { x: 40.0, y: 40.0, width: 4.0, height: 4.0 }]);
        assert_eq!(p.finders.len(), 1);
        assert_eq!(p.finders[0].anchor(), Some((5.0, 6.0)));
        assert_eq!(p.alignment_dots, vec![RectPrimitive { x: 8.0, y: 8.0, width: 3.0, height: 3.0 }]);
    }

    #[test]
    fn nested_role_groups_keep_their_own_shapes() {
        let svg = concat!(
            r#"<svg><g id="qr-dot-color-layer">"#,
            r#"<rect x="40" y="40" width="4" height="4"/>"#,
            r#"<g id="qr-corners-square-0"><path d="M 0 0v 28h 28v -28z"/></g>"#,
            r#"<g id="qr-corners-dot-0"><rect x="8" y="8" width="3" height="3"/></g>"#,
            r#"</g></svg>"#
        );
        let p = StructuralExtractor::new().extract(svg).unwrap();
        assert_eq!(p.modules, vec![RectPrimitive { x: 40.0, y: 40.0, width: 4.0, height: 4.0 }]);
        assert_eq!(p.finders, vec![FinderPath::new("M 0 0v 28h 28v -28z")]);
        assert_eq!(p.alignment_dots, vec![RectPrimitive { x: 8.0, y: 8.0, width: 3.0, height: 3.0 }]);
    }

    #[test]
    fn deep_plain_nesting_is_not_a_reference_hop() {
        let depth = MAX_DEREF_DEPTH * 2;
        let svg = format!(
            r#"<svg><g id="clip-path-dot-color">{}<rect x="12" y="14" width="2" height="2"/>{}</g></svg>"#,
            "<g>".repeat(depth),
            "</g>".repeat(depth)
        );
        let p = StructuralExtractor::new().extract(&svg).unwrap();
        assert_eq!(p.modules, vec![RectPrimitive { x: 12.0, y: 14.0, width: 2.0, height: 2.0 }]);
    }

    #[test]
    fn reference_cycles_stop_at_the_hop_limit() {
        let svg = concat!(
            r##"<svg><defs><g id="a"><use href="#b"/></g><g id="b"><use href="#a"/></g></defs>"##,
            r##"<g id="clip-path-dot-color"><rect x="1" y="1" width="1" height="1"/><use href="#a"/></g>"##,
            r#"</svg>"#
        );
        let p = StructuralExtractor::new().extract(svg).unwrap();
        assert_eq!(p.modules.len(), 1);
    }

    #[test]
    fn corner_dot_ids_are_not_modules() {
        assert_eq!(classify("clip-path-corners-dot-color-0-0"), Some(Role::AlignmentDot));
        assert_eq!(classify("clip-path-corners-square-color-1-0"), Some(Role::Finder));
        assert_eq!(classify("clip-path-dot-color"), Some(Role::Module));
        assert_eq!(classify("clip-path-background-color"), None);
    }

    #[test]
    fn missing_svg_root_is_encoder_failure() {
        let err = StructuralExtractor::new().extract("<div>nothing</div>").unwrap_err();
        assert!(matches!(err, Error::EncoderProduceFailure(_)));
    }

    #[test]
    fn missing_modules_is_empty_geometry() {
        let svg = r#"<svg><defs><clipPath id="clip-path-dot-color"></clipPath></defs></svg>"#;
        let err = StructuralExtractor::new().extract(svg).unwrap_err();
        assert!(matches!(err, Error::EmptyGeometry(_)));
    }

    #[test]
    fn anchor_handles_compact_and_exponent_forms() {
        assert_eq!(FinderPath::new("M24 36v84").anchor(), Some((24.0, 36.0)));
        assert_eq!(FinderPath::new("  m 1.5,-2e1 h3").anchor(), Some((1.5, -20.0)));
        assert_eq!(FinderPath::new("L 1 2").anchor(), None);
        assert_eq!(FinderPath::new("M 7").anchor(), None);
    }
}
