//! Positioned text extraction from PDF content streams.
//!
//! A page's content stream is walked with a small text-state machine that
//! tracks the text matrix, the current transformation matrix, the current
//! font and the spacing parameters. Every show-text operator produces a
//! [`TextSpan`] decoded through the font's encoding and measured with its
//! `/Widths` when available. Spans are then grouped into lines, ordered
//! column by column, and cut into the requested [`TextUnit`].
//!
//! ```text
//! content ops -> TextSpan[] -> TextLine[] -> TextSegment[] (char | word | line)
//! ```

use anyhow::{Context, Result};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use super::fonts::{page_fonts, FontInfo, PageFonts};
use super::lopdf_helper::{as_number, page_ids};
use crate::types::{Rect, TextSegment, TextUnit};

/// Approximate glyph advance as a fraction of the font size, used when the
/// font carries no `/Widths`.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Portion of the font size below / above the baseline covered by a box.
const DESCENT_RATIO: f32 = 0.2;
const ASCENT_RATIO: f32 = 0.8;

/// Spans whose baselines differ by less than this share a line.
const Y_TOLERANCE: f32 = 1.0;

/// Horizontal gap, in font sizes, beyond which same-baseline spans are
/// treated as separate columns.
const COLUMN_GAP_RATIO: f32 = 2.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A run of text shown by a single operator, in page space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub x: f32,
    /// Baseline
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
}

impl TextSpan {
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.x,
            self.y - self.font_size * DESCENT_RATIO,
            self.x + self.width,
            self.y + self.font_size * ASCENT_RATIO,
        )
    }

    /// Box of the chars in `start..end` (char offsets), assuming even advance.
    fn sub_rect(&self, start: usize, end: usize) -> Rect {
        let count = self.text.chars().count().max(1) as f32;
        let advance = self.width / count;
        let full = self.rect();
        Rect::new(
            self.x + advance * start as f32,
            full.y0,
            self.x + advance * end as f32,
            full.y1,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub y: f32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn rect(&self) -> Option<Rect> {
        self.spans
            .iter()
            .map(TextSpan::rect)
            .reduce(|a, b| a.union(&b))
    }
    /// Leftmost and rightmost x covered by the line's spans.
    pub fn x_range(&self) -> (f32, f32) {
        self.spans.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(l, r), s| {
            (l.min(s.x), r.max(s.x + s.width))
        })
    }
}

// 2x3 affine matrices stored as [a, b, c, d, e, f]
fn multiply(m: &[f32; 6], n: &[f32; 6]) -> [f32; 6] {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn apply(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn matrix_operands(operands: &[Object]) -> Option<[f32; 6]> {
    let vals: Vec<f32> = operands.iter().take(6).filter_map(as_number).collect();
    <[f32; 6]>::try_from(vals.as_slice()).ok()
}

fn number_at(operands: &[Object], index: usize) -> Option<f32> {
    operands.get(index).and_then(as_number)
}

/// Best-effort decoding of a PDF string: UTF-16BE with BOM, UTF-8, then Latin-1.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}

#[derive(Debug, Clone)]
struct TextState<'a> {
    fonts: &'a PageFonts,
    font: Option<&'a FontInfo>,
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    font_size: f32,
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl<'a> TextState<'a> {
    fn new(fonts: &'a PageFonts) -> Self {
        Self {
            fonts,
            font: None,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 0.0,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }

    fn set_font(&mut self, name: Option<&[u8]>) {
        let fonts = self.fonts;
        self.font = name.and_then(|n| fonts.get(n));
    }

    fn decode(&self, bytes: &[u8]) -> String {
        match self.font {
            Some(font) => font.decode(bytes),
            None => decode_pdf_string(bytes),
        }
    }

    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Horizontal advance, in text space, after showing `bytes` (decoded as `text`).
    fn advance_for(&self, bytes: &[u8], text: &str) -> f32 {
        match self.font.filter(|f| f.has_widths()) {
            Some(font) => bytes
                .iter()
                .map(|&code| {
                    let glyph = font.width_of(code).unwrap_or(DEFAULT_GLYPH_WIDTH) / 1000.0 * self.font_size;
                    let word = if code == b' ' { self.word_spacing } else { 0.0 };
                    (glyph + self.char_spacing + word) * self.horiz_scale
                })
                .sum(),
            None => text
                .chars()
                .map(|ch| {
                    let glyph = self.font_size * APPROX_CHAR_WIDTH_RATIO + self.char_spacing;
                    let word = if ch == ' ' { self.word_spacing } else { 0.0 };
                    (glyph + word) * self.horiz_scale
                })
                .sum(),
        }
    }

    fn advance(&mut self, dx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, dx, 0.0], &self.text_matrix);
    }

    /// Page-space span covering text space `offset..offset + width` from the pen.
    fn span_at(&self, text: String, offset: f32, width: f32) -> TextSpan {
        let full = multiply(&self.text_matrix, &self.ctm);
        let (x0, y0) = apply(&full, offset, self.text_rise);
        let (x1, y1) = apply(&full, offset + width, self.text_rise);
        let scale = (full[2].powi(2) + full[3].powi(2)).sqrt();
        TextSpan {
            text,
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs().max((y1 - y0).abs()),
            font_size: (self.font_size * scale).abs(),
        }
    }

    fn show(&mut self, bytes: &[u8], spans: &mut Vec<TextSpan>) {
        if bytes.is_empty() {
            return;
        }
        let text = self.decode(bytes);
        let dx = self.advance_for(bytes, &text);
        if !text.trim().is_empty() {
            spans.push(self.span_at(text, 0.0, dx));
        }
        self.advance(dx);
    }

    /// `TJ`: strings interleaved with kerning in thousandths of a unit.
    fn show_array(&mut self, items: &[Object], spans: &mut Vec<TextSpan>) {
        let mut buf = String::new();
        let gap = self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale * 0.3;
        // Pen position relative to the start of the array, and where the
        // shown glyphs begin and end.
        let mut pen = 0.0_f32;
        let mut first: Option<f32> = None;
        let mut last = 0.0_f32;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let fragment = self.decode(bytes);
                    let dx = self.advance_for(bytes, &fragment);
                    if !fragment.trim().is_empty() {
                        first.get_or_insert(pen);
                        last = pen + dx;
                    }
                    buf.push_str(&fragment);
                    pen += dx;
                }
                other => {
                    if let Some(adj) = as_number(other) {
                        let dx = -adj / 1000.0 * self.font_size * self.horiz_scale;
                        if dx > gap && !buf.is_empty() && !buf.ends_with(' ') {
                            buf.push(' ');
                        }
                        pen += dx;
                    }
                }
            }
        }

        let text = buf.trim().to_string();
        if let Some(start) = first {
            spans.push(self.span_at(text, start, (last - start).max(0.0)));
        }
        self.advance(pen);
    }
}

/// Walk decoded content operations and collect every shown span.
pub fn spans_from_operations(operations: &[lopdf::content::Operation], fonts: &PageFonts) -> Vec<TextSpan> {
    let mut state = TextState::new(fonts);
    let mut spans = Vec::new();

    for op in operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(ctm) = state.ctm_stack.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                state.set_font(operands.first().and_then(|o| o.as_name().ok()));
                if let Some(size) = number_at(operands, 1) {
                    state.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (number_at(operands, 0), number_at(operands, 1)) {
                    state.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (number_at(operands, 0), number_at(operands, 1)) {
                    state.leading = -ty;
                    state.translate_line(tx, ty);
                }
            }
            "T*" => state.next_line(),
            "TL" => {
                if let Some(v) = number_at(operands, 0) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = number_at(operands, 0) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = number_at(operands, 0) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = number_at(operands, 0) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = number_at(operands, 0) {
                    state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(bytes, &mut spans);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    state.show(bytes, &mut spans);
                }
            }
            "\"" => {
                if let Some(aw) = number_at(operands, 0) {
                    state.word_spacing = aw;
                }
                if let Some(ac) = number_at(operands, 1) {
                    state.char_spacing = ac;
                }
                state.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    state.show(bytes, &mut spans);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    state.show_array(items, &mut spans);
                }
            }
            _ => {}
        }
    }

    spans
}

pub fn extract_page_spans(document: &Document, page_id: ObjectId) -> Result<Vec<TextSpan>> {
    let raw = document
        .get_page_content(page_id)
        .with_context(|| format!("cannot read content of page {:?}", page_id))?;
    let content = Content::decode(&raw)
        .with_context(|| format!("cannot decode content stream of page {:?}", page_id))?;
    let fonts = page_fonts(document, page_id);
    Ok(spans_from_operations(&content.operations, &fonts))
}

/// Distance from the line's horizontal extent to the span, 0 when they overlap.
fn horizontal_gap((left, right): (f32, f32), span: &TextSpan) -> f32 {
    if span.x > right {
        span.x - right
    } else if span.x + span.width < left {
        left - (span.x + span.width)
    } else {
        0.0
    }
}

fn overlaps(a: (f32, f32), b: (f32, f32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Group spans into lines in reading order.
///
/// Spans share a line when their baselines agree and no column gutter
/// separates them. Lines are then read column by column, see
/// [`order_by_columns`].
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for span in spans {
        let max_gap = span.font_size * COLUMN_GAP_RATIO;
        let target = lines
            .iter()
            .enumerate()
            .rev()
            .take_while(|(_, line)| (line.y - span.y).abs() <= Y_TOLERANCE)
            .find(|(_, line)| horizontal_gap(line.x_range(), &span) <= max_gap)
            .map(|(i, _)| i);
        match target {
            Some(i) => lines[i].spans.push(span),
            None => lines.push(TextLine {
                y: span.y,
                spans: vec![span],
            }),
        }
    }

    for line in &mut lines {
        line.spans.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    order_by_columns(lines)
}

/// Reorder top-down lines so each column is read to its end before the next.
///
/// A line continues the column whose last line it horizontally overlaps. A
/// line overlapping several columns closes the current band; within a band
/// columns are read left to right.
fn order_by_columns(lines: Vec<TextLine>) -> Vec<TextLine> {
    let mut bands: Vec<Vec<Vec<TextLine>>> = Vec::new();
    let mut columns: Vec<Vec<TextLine>> = Vec::new();

    for line in lines {
        let range = line.x_range();
        let hits: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.last().is_some_and(|last| overlaps(last.x_range(), range)))
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [i] => columns[*i].push(line),
            [] => columns.push(vec![line]),
            _ => {
                bands.push(std::mem::take(&mut columns));
                columns.push(vec![line]);
            }
        }
    }
    bands.push(columns);

    let column_left = |column: &Vec<TextLine>| column.first().map_or(0.0, |l| l.x_range().0);
    bands
        .into_iter()
        .flat_map(|mut band| {
            band.sort_by(|a, b| column_left(a).total_cmp(&column_left(b)));
            band.into_iter().flatten()
        })
        .collect()
}

/// Cut one page's lines into segments of the requested granularity.
pub fn lines_to_segments(lines: &[TextLine], unit: TextUnit, page_index: usize) -> Vec<TextSegment> {
    let mut segments = Vec::new();

    for line in lines {
        match unit {
            TextUnit::Line => {
                if let Some(rect) = line.rect() {
                    segments.push(TextSegment::new(line.text(), rect, page_index));
                }
            }
            TextUnit::Word => {
                for span in &line.spans {
                    for (start, word) in words_with_offsets(&span.text) {
                        let end = start + word.chars().count();
                        segments.push(TextSegment::new(word, span.sub_rect(start, end), page_index));
                    }
                }
            }
            TextUnit::Char => {
                for span in &line.spans {
                    for (i, ch) in span.text.chars().enumerate() {
                        if !ch.is_whitespace() {
                            segments.push(TextSegment::new(ch, span.sub_rect(i, i + 1), page_index));
                        }
                    }
                }
            }
        }
    }

    segments
}

/// Whitespace-separated words with their starting char offset.
fn words_with_offsets(text: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (i, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push((start, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                start = i;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push((start, current));
    }
    words
}

/// Extract every page of `document` as ordered text units.
pub fn extract_text_segments(document: &Document, unit: TextUnit) -> Result<Vec<TextSegment>> {
    let mut segments = Vec::new();

    for (page_index, page_id) in page_ids(document).into_iter().enumerate() {
        log::info!("Processing page {}", page_index);
        let spans = match extract_page_spans(document, page_id) {
            Ok(spans) => spans,
            Err(e) => {
                log::warn!("Skipping page {}: {:#}", page_index, e);
                continue;
            }
        };
        let lines = group_spans_into_lines(spans);
        segments.extend(lines_to_segments(&lines, unit, page_index));
    }

    Ok(segments)
}
