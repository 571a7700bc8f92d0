// PDF extraction module
pub mod fonts;
pub mod lopdf_helper;
pub mod text_layout;

pub use fonts::{page_fonts, FontInfo, PageFonts};
pub use lopdf_helper::{load_pdf, media_box, page_ids};
pub use text_layout::{extract_text_segments, group_spans_into_lines, TextLine, TextSpan};
