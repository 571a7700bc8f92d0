// Shared fixtures: generated PDFs and stub language models
#![allow(dead_code)]

use anyhow::{bail, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::path::Path;

use pdf_ai_colorize::LanguageModel;

/// Build a Letter-size PDF with one page per entry, each page showing its
/// lines top to bottom in 12pt Helvetica.
pub fn build_pdf(pages: &[&[&str]]) -> Document {
    let helvetica = dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    };
    let contents = pages
        .iter()
        .map(|lines| {
            let placed: Vec<(Vec<u8>, i64, i64)> = lines
                .iter()
                .enumerate()
                .map(|(i, line)| (line.as_bytes().to_vec(), 72, 720 - 20 * i as i64))
                .collect();
            text_operations(12, &placed)
        })
        .collect();
    build_pdf_with_font(helvetica, contents)
}

/// `BT /F1 size Tf` followed by one `Tm`/`Tj` pair per `(bytes, x, y)`.
pub fn text_operations(size: i64, lines: &[(Vec<u8>, i64, i64)]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
    ];
    for (bytes, x, y) in lines {
        operations.push(Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), (*x).into(), (*y).into()],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(bytes.clone(), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Letter-size PDF with `font` registered as `/F1` and one page per content.
pub fn build_pdf_with_font(font: Dictionary, pages: Vec<Vec<Operation>>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(font);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_pdf(path: &Path, pages: &[&[&str]]) {
    build_pdf(pages).save(path).expect("save fixture pdf");
}

/// Always reports the same loss.
pub struct FixedLoss(pub f32);

impl LanguageModel for FixedLoss {
    fn mean_loss(&mut self, _text: &str) -> Result<f32> {
        Ok(self.0)
    }
}

/// Fails on every text containing `trigger`, otherwise reports `loss`.
pub struct FailsOn {
    pub trigger: &'static str,
    pub loss: f32,
    pub calls: usize,
}

impl LanguageModel for FailsOn {
    fn mean_loss(&mut self, text: &str) -> Result<f32> {
        self.calls += 1;
        if text.contains(self.trigger) {
            bail!("simulated inference failure");
        }
        Ok(self.loss)
    }
}

/// Operators of every content stream on `page` (0-based), concatenated.
pub fn page_operators(doc: &Document, page: usize) -> Vec<String> {
    let page_id = doc
        .get_pages()
        .into_values()
        .nth(page)
        .expect("page exists");
    let raw = doc.get_page_content(page_id).expect("page content");
    Content::decode(&raw)
        .expect("decode content")
        .operations
        .into_iter()
        .map(|op| op.operator)
        .collect()
}
