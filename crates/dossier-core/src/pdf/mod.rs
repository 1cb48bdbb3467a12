mod canvas;
pub(crate) mod font;
mod image;
mod merge;
mod metrics;

pub use canvas::{PageCanvas, TextStyle};
pub use font::EmbeddedFont;
pub use image::{PreparedImage, fit_within};
pub use merge::{MergedDocument, open_pdf};
pub use metrics::{StandardFont, encode_win_ansi};

#[cfg(test)]
pub(crate) use merge::tests::{create_test_pdf, page_texts};
