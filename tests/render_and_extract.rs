// Overlay rendering, legend output and extraction against generated PDFs
mod common;

use common::{build_pdf, build_pdf_with_font, page_operators, text_operations};
use lopdf::{dictionary, Object};
use pdf_ai_colorize::colorize::colorize_document;
use pdf_ai_colorize::legend::create_legend;
use pdf_ai_colorize::pdf_extraction::{extract_text_segments, media_box, page_ids};
use pdf_ai_colorize::{Rect, TextSegment, TextUnit};
use rstest::rstest;

#[test]
fn extracted_line_lies_inside_the_page() {
    let doc = build_pdf(&[&["Hello extraction world"]]);
    let segments = extract_text_segments(&doc, TextUnit::Line).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "Hello extraction world");
    assert_eq!(segments[0].page_index, 0);

    let [x0, y0, x1, y1] = media_box(&doc, page_ids(&doc)[0]);
    let page = Rect::new(x0, y0, x1, y1);
    assert!(page.contains(&segments[0].region));
    assert!(segments[0].region.width() > 0.0);
}

#[rstest]
#[case(TextUnit::Char, 9)]
#[case(TextUnit::Word, 3)]
#[case(TextUnit::Line, 1)]
fn unit_granularity(#[case] unit: TextUnit, #[case] expected: usize) {
    let doc = build_pdf(&[&["one two six"]]);
    let segments = extract_text_segments(&doc, unit).unwrap();
    assert_eq!(segments.len(), expected);
}

#[test]
fn win_ansi_font_decodes_typographic_punctuation() {
    let widths: Vec<Object> = (32..=151).map(|_| 600.into()).collect();
    let font = dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => "Arial",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "LastChar" => 151,
        "Widths" => widths,
    };
    let mut shown = vec![0x93];
    shown.extend_from_slice(b"Hi there");
    shown.extend_from_slice(&[0x94, b' ', 0x97]);
    shown.extend_from_slice(b" ok");
    let doc = build_pdf_with_font(font, vec![text_operations(12, &[(shown, 72, 700)])]);

    let segments = extract_text_segments(&doc, TextUnit::Line).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "\u{201C}Hi there\u{201D} \u{2014} ok");
    // 15 codes at 600/1000 of 12pt
    assert!((segments[0].region.x1 - 180.0).abs() < 1e-3);
}

#[test]
fn two_column_page_yields_one_unit_per_column_line() {
    let helvetica = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    };
    let placed = [
        ("Left column first line", 72, 700),
        ("Right column first line", 330, 700),
        ("Left column second line", 72, 688),
        ("Right column second line", 330, 688),
    ]
    .map(|(text, x, y)| (text.as_bytes().to_vec(), x, y));
    let doc = build_pdf_with_font(helvetica, vec![text_operations(10, &placed)]);

    let segments = extract_text_segments(&doc, TextUnit::Line).unwrap();
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(
        texts,
        [
            "Left column first line",
            "Left column second line",
            "Right column first line",
            "Right column second line",
        ]
    );
    assert!(segments[..2].iter().all(|s| s.region.x1 < 330.0));
    assert!(segments[2..].iter().all(|s| s.region.x0 >= 330.0));
}

#[test]
fn out_of_range_page_is_skipped_and_document_still_saves() {
    let mut doc = build_pdf(&[&["Only one page here"]]);
    let mut good = TextSegment::new("good", Rect::new(72.0, 700.0, 200.0, 712.0), 0);
    good.score = 0.9;
    let stray = TextSegment::new("stray", Rect::new(0.0, 0.0, 10.0, 10.0), 4);

    let stats = colorize_document(&mut doc, &[good, stray], 0.4).unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    doc.save(&path).unwrap();
    let reloaded = lopdf::Document::load(&path).unwrap();
    let ops = page_operators(&reloaded, 0);
    assert_eq!(ops.iter().filter(|op| *op == "re").count(), 1);
    assert!(ops.iter().any(|op| op == "gs"));
}

#[test]
fn overlay_uses_requested_fill_opacity() {
    let mut doc = build_pdf(&[&["Opacity check line"]]);
    let segment = TextSegment::new("x", Rect::new(72.0, 700.0, 100.0, 712.0), 0);
    colorize_document(&mut doc, &[segment], 0.25).unwrap();

    let fill_alphas: Vec<f32> = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|dict| matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"ExtGState"))
        .filter_map(|dict| dict.get(b"ca").ok().and_then(|o| o.as_float().ok()))
        .collect();
    assert_eq!(fill_alphas, vec![0.25]);
}

#[test]
fn legend_file_has_one_page_and_eleven_swatches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores_legend.pdf");
    create_legend(&path).unwrap();

    let legend = lopdf::Document::load(&path).unwrap();
    assert_eq!(legend.get_pages().len(), 1);
    let ops = page_operators(&legend, 0);
    assert_eq!(ops.iter().filter(|op| *op == "re").count(), 11);
}
