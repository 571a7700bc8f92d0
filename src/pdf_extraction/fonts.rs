// Per-page font lookup: declared encoding and glyph widths
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

use super::lopdf_helper::{as_number, inherited, resolve};
use super::text_layout::decode_pdf_string;

/// Base encodings lopdf carries decoding tables for.
const SIMPLE_ENCODINGS: [&str; 4] = [
    "StandardEncoding",
    "WinAnsiEncoding",
    "MacRomanEncoding",
    "MacExpertEncoding",
];

/// What the extractor needs from a font dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontInfo {
    pub encoding: Option<String>,
    pub first_char: u32,
    /// Glyph advances in thousandths of text space, indexed from `first_char`.
    pub widths: Vec<f32>,
}

/// Font resource name (as used by `Tf`) to its info.
pub type PageFonts = BTreeMap<Vec<u8>, FontInfo>;

impl FontInfo {
    pub fn from_dict(document: &Document, font: &Dictionary) -> Self {
        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        // Composite and Type3 fonts need CMaps or a FontMatrix; use the heuristics.
        if subtype == Some(&b"Type0"[..]) || subtype == Some(&b"Type3"[..]) {
            return Self::default();
        }

        let encoding = font
            .get(b"Encoding")
            .ok()
            .map(|o| resolve(document, o))
            .and_then(|enc| match enc {
                Object::Name(name) => Some(name.as_slice()),
                Object::Dictionary(dict) => dict.get(b"BaseEncoding").ok().and_then(|b| b.as_name().ok()),
                _ => None,
            })
            .map(|name| String::from_utf8_lossy(name).into_owned());

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| as_number(resolve(document, o)))
            .unwrap_or(0.0)
            .max(0.0) as u32;

        let widths = font
            .get(b"Widths")
            .ok()
            .map(|o| resolve(document, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| as_number(resolve(document, w)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            encoding,
            first_char,
            widths,
        }
    }

    /// Decode a shown string through the declared encoding when lopdf knows it.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.encoding.as_deref() {
            Some(enc) if SIMPLE_ENCODINGS.contains(&enc) => Document::decode_text(Some(enc), bytes),
            _ => decode_pdf_string(bytes),
        }
    }

    pub fn width_of(&self, code: u8) -> Option<f32> {
        (code as u32)
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
    }

    pub fn has_widths(&self) -> bool {
        !self.widths.is_empty()
    }
}

/// Fonts reachable from the page's (possibly inherited) resources.
pub fn page_fonts(document: &Document, page_id: ObjectId) -> PageFonts {
    let mut fonts = PageFonts::new();
    let Ok(page) = document.get_object(page_id).and_then(Object::as_dict) else {
        return fonts;
    };
    let Some(font_dict) = inherited(document, page, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .and_then(|r| r.get(b"Font").ok())
        .and_then(|f| resolve(document, f).as_dict().ok())
    else {
        return fonts;
    };

    for (name, obj) in font_dict.iter() {
        if let Ok(dict) = resolve(document, obj).as_dict() {
            fonts.insert(name.clone(), FontInfo::from_dict(document, dict));
        }
    }
    log::debug!("Page {:?} declares {} fonts", page_id, fonts.len());
    fonts
}
