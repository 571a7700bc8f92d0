// Score-to-color mapping and the translucent overlay drawn onto each page
use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::Path;

use crate::pdf_extraction::lopdf_helper::{inherited, page_ids};
use crate::types::{Rect, TextSegment};

/// RGB color with channels in [0, 1].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    fn operands(&self) -> Vec<Object> {
        vec![self.r.into(), self.g.into(), self.b.into()]
    }
}

/// Green (human) through yellow to red (AI-generated).
pub fn score_to_color(score: f32) -> Rgb {
    let s = score.clamp(0.0, 1.0);
    if s < 0.5 {
        Rgb::new(2.0 * s, 1.0, 0.0)
    } else {
        Rgb::new(1.0, 2.0 * (1.0 - s), 0.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    pub skipped: usize,
}

/// Draw one translucent box per segment on top of the existing page content.
pub fn colorize_document(
    document: &mut Document,
    segments: &[TextSegment],
    opacity: f32,
) -> Result<RenderStats> {
    let pages = page_ids(document);
    let mut stats = RenderStats::default();

    let mut by_page: BTreeMap<usize, Vec<&TextSegment>> = BTreeMap::new();
    for segment in segments {
        by_page.entry(segment.page_index).or_default().push(segment);
    }

    for (page_index, page_segments) in by_page {
        let Some(&page_id) = pages.get(page_index) else {
            for _ in &page_segments {
                log::warn!("Page {} out of range, skipping", page_index);
            }
            stats.skipped += page_segments.len();
            continue;
        };

        let boxes: Vec<(Rect, Rgb)> = page_segments
            .iter()
            .map(|s| (s.region, score_to_color(s.score)))
            .collect();
        overlay_page(document, page_id, &boxes, opacity)
            .with_context(|| format!("failed to draw overlay on page {}", page_index))?;
        stats.drawn += boxes.len();
    }

    Ok(stats)
}

/// Colorize and write the result to `output`.
pub fn save_colorized(
    mut document: Document,
    segments: &[TextSegment],
    opacity: f32,
    output: &Path,
) -> Result<RenderStats> {
    log::info!("Colorizing PDF and saving to {}", output.display());
    let stats = colorize_document(&mut document, segments, opacity)?;
    document
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("Saved colorized PDF to {}", output.display());
    Ok(stats)
}

fn overlay_page(document: &mut Document, page_id: ObjectId, boxes: &[(Rect, Rgb)], opacity: f32) -> Result<()> {
    let gs_id = document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => opacity,
        "CA" => 1.0_f32,
    });
    let gs_name = register_ext_gstate(document, page_id, gs_id)?;

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(gs_name)]),
    ];
    for (rect, color) in boxes {
        operations.push(Operation::new("rg", color.operands()));
        operations.push(Operation::new("RG", color.operands()));
        operations.push(Operation::new(
            "re",
            vec![rect.x0.into(), rect.y0.into(), rect.width().into(), rect.height().into()],
        ));
        operations.push(Operation::new("B", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    let mut overlay = b"Q\n".to_vec();
    overlay.extend(Content { operations }.encode()?);
    append_overlay(document, page_id, overlay)
}

/// Wrap the existing contents in `q .. Q` and append the overlay stream after them.
fn append_overlay(document: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = {
        let page = document.get_object(page_id)?.as_dict()?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match document.get_object(*id) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        }
    };

    let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = document.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    document
        .get_object_mut(page_id)?
        .as_dict_mut()?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Add `gs_id` to the page's ExtGState resources under a fresh name.
fn register_ext_gstate(document: &mut Document, page_id: ObjectId, gs_id: ObjectId) -> Result<Vec<u8>> {
    let shared = match page_resources_mut(document, page_id)?.get(b"ExtGState") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    let mut ext = match shared {
        Some(id) => document.get_object(id)?.as_dict()?.clone(),
        None => match page_resources_mut(document, page_id)?.get(b"ExtGState") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
    };

    let name = (0..)
        .map(|i| format!("GSai{}", i).into_bytes())
        .find(|candidate| !ext.has(candidate))
        .unwrap_or_else(|| b"GSai".to_vec());
    ext.set(name.clone(), gs_id);

    page_resources_mut(document, page_id)?.set("ExtGState", ext);
    Ok(name)
}

/// The page's own resource dictionary, copying inherited resources onto
/// the page first so edits stay local to it.
fn page_resources_mut(document: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    enum Location {
        Inline,
        Indirect(ObjectId),
        Missing(Dictionary),
    }

    let location = {
        let page = document.get_object(page_id)?.as_dict()?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Location::Indirect(*id),
            Ok(Object::Dictionary(_)) => Location::Inline,
            _ => Location::Missing(
                inherited(document, page, b"Resources")
                    .and_then(|o| o.as_dict().ok())
                    .cloned()
                    .unwrap_or_default(),
            ),
        }
    };

    match location {
        Location::Indirect(id) => Ok(document.get_object_mut(id)?.as_dict_mut()?),
        Location::Inline => Ok(document
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Resources")?
            .as_dict_mut()?),
        Location::Missing(resources) => {
            let page = document.get_object_mut(page_id)?.as_dict_mut()?;
            page.set("Resources", resources);
            Ok(page.get_mut(b"Resources")?.as_dict_mut()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Rgb, b: Rgb) -> bool {
        (a.r - b.r).abs() < 1e-6 && (a.g - b.g).abs() < 1e-6 && (a.b - b.b).abs() < 1e-6
    }

    #[test]
    fn endpoints_and_midpoint() {
        assert_eq!(score_to_color(0.0), Rgb::new(0.0, 1.0, 0.0));
        assert_eq!(score_to_color(0.5), Rgb::new(1.0, 1.0, 0.0));
        assert_eq!(score_to_color(1.0), Rgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn continuous_at_midpoint() {
        let below = score_to_color(0.5 - 1e-6);
        let above = score_to_color(0.5);
        assert!((below.r - above.r).abs() < 1e-5);
        assert!((below.g - above.g).abs() < 1e-5);
    }

    #[test]
    fn channels_are_monotonic() {
        let colors: Vec<Rgb> = (0..=100).map(|i| score_to_color(i as f32 / 100.0)).collect();
        for pair in colors.windows(2) {
            assert!(pair[1].r >= pair[0].r);
            assert!(pair[1].g <= pair[0].g);
            assert_eq!(pair[1].b, 0.0);
        }
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert!(approx(score_to_color(-1.0), score_to_color(0.0)));
        assert!(approx(score_to_color(2.0), score_to_color(1.0)));
    }
}
