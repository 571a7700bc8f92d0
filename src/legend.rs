// Stand-alone legend page showing the score color gradient
use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

use crate::colorize::score_to_color;
use crate::types::ScoreCategory;

const PAGE_WIDTH: f32 = 400.0;
const PAGE_HEIGHT: f32 = 200.0;
const SWATCH_COUNT: usize = 11;
const SWATCH_TOP: f32 = 50.0;
const SWATCH_HEIGHT: f32 = 10.0;
const SWATCH_LEFT: f32 = 20.0;
const SWATCH_RIGHT: f32 = 100.0;
const LABEL_X: f32 = 110.0;

/// `<dir>/<stem>_legend.<ext>` next to the colorized output.
pub fn legend_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    output.with_file_name(format!("{}_legend.{}", stem, ext))
}

pub fn swatch_label(score: f32) -> String {
    format!("{:.1} - {}", score, ScoreCategory::of(score).label())
}

fn show_text(ops: &mut Vec<Operation>, x: f32, top: f32, size: i64, text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), (PAGE_HEIGHT - top).into()]));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

/// Drawing operations for the legend. Layout coordinates are measured from
/// the top of the page and flipped into PDF space here.
pub fn legend_operations() -> Vec<Operation> {
    let mut ops = vec![Operation::new("rg", vec![0.into(), 0.into(), 0.into()])];
    show_text(&mut ops, 20.0, 30.0, 14, "AI Detection Score Legend");

    for i in 0..SWATCH_COUNT {
        let score = i as f32 / 10.0;
        let color = score_to_color(score);
        let top = SWATCH_TOP + i as f32 * SWATCH_HEIGHT;

        ops.push(Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]));
        ops.push(Operation::new("RG", vec![color.r.into(), color.g.into(), color.b.into()]));
        ops.push(Operation::new(
            "re",
            vec![
                SWATCH_LEFT.into(),
                (PAGE_HEIGHT - top - SWATCH_HEIGHT).into(),
                (SWATCH_RIGHT - SWATCH_LEFT).into(),
                SWATCH_HEIGHT.into(),
            ],
        ));
        ops.push(Operation::new("B", vec![]));

        ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
        show_text(&mut ops, LABEL_X, top + 8.0, 9, &swatch_label(score));
    }

    ops
}

/// Build the single-page legend document.
pub fn build_legend() -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let content = Content {
        operations: legend_operations(),
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

pub fn create_legend(path: &Path) -> Result<()> {
    let mut doc = build_legend()?;
    doc.save(path)
        .with_context(|| format!("failed to write legend {}", path.display()))?;
    log::info!("Saved legend to {}", path.display());
    Ok(())
}
