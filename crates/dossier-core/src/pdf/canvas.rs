//! A small page builder for generated pages (cover, image and label pages).
//!
//! Callers lay out in millimetres from the top-left corner, with text placed
//! by its baseline. Coordinates are converted to PDF user space (points,
//! origin bottom-left) when operations are recorded.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::font::EmbeddedFont;
use super::image::PreparedImage;
use super::metrics::{StandardFont, encode_win_ansi};
use crate::config::{PT_PER_MM, PageSize, TextColor, mm};
use crate::error::Result;
use crate::text::{self, Face};

/// Resource name of the embedded complex-script font.
const EMBEDDED_FONT_RESOURCE: &str = "FB";

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub color: TextColor,
}

impl TextStyle {
    pub const fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            color: TextColor::black(),
        }
    }

    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub const fn color(mut self, color: TextColor) -> Self {
        self.color = color;
        self
    }
}

/// Accumulates pages of drawing operations, then builds a standalone
/// document sharing one resource dictionary across its pages.
pub struct PageCanvas<'a> {
    width_pt: f32,
    height_pt: f32,
    font: Option<&'a EmbeddedFont>,
    pages: Vec<Vec<Operation>>,
    images: Vec<Stream>,
    uses_embedded_font: bool,
}

impl<'a> PageCanvas<'a> {
    /// Start a canvas with one empty page.
    pub fn new(page_size: PageSize, font: Option<&'a EmbeddedFont>) -> Self {
        let (width_pt, height_pt) = page_size.dimensions_pt();
        Self {
            width_pt,
            height_pt,
            font,
            pages: vec![Vec::new()],
            images: Vec::new(),
            uses_embedded_font: false,
        }
    }

    pub fn page_width(&self) -> f32 {
        self.width_pt / PT_PER_MM
    }

    pub fn page_height(&self) -> f32 {
        self.height_pt / PT_PER_MM
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn current_page(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn face(&self, text: &str, style: &TextStyle) -> Face<'a> {
        Face::select(text, style.bold, self.font)
    }

    /// Rendered width of `text` in millimetres.
    pub fn text_width(&self, text: &str, style: &TextStyle) -> f32 {
        self.face(text, style).string_width(text, style.size) / PT_PER_MM
    }

    /// Wrap `text` to `max_width` millimetres using the script-appropriate
    /// wrapper.
    pub fn wrap(&self, text: &str, style: &TextStyle, max_width: f32) -> Vec<String> {
        let face = self.face(text, style);
        text::wrap(text, &face, style.size, mm(max_width))
    }

    /// Draw one line with its baseline at `(x, y)`.
    pub fn text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        if text.is_empty() {
            return;
        }

        let face = self.face(text, style);
        let (resource, encoded) = match face {
            Face::Standard(font) => (
                font.resource_name(),
                Object::String(encode_win_ansi(text), StringFormat::Literal),
            ),
            Face::Embedded(font) => {
                self.uses_embedded_font = true;
                (
                    EMBEDDED_FONT_RESOURCE,
                    Object::String(font.encode_glyphs(text), StringFormat::Hexadecimal),
                )
            }
        };

        let x_pt = mm(x);
        let y_pt = self.height_pt - mm(y);
        let TextColor { r, g, b } = style.color;

        self.current_page().extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(resource.as_bytes().to_vec()), style.size.into()],
            ),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Td", vec![x_pt.into(), y_pt.into()]),
            Operation::new("Tj", vec![encoded]),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Draw one line centred horizontally on the page.
    pub fn text_centered(&mut self, text: &str, y: f32, style: &TextStyle) {
        let x = (self.page_width() - self.text_width(text, style)) / 2.0;
        self.text(text, x.max(0.0), y, style);
    }

    /// Draw an image with its top-left corner at `(x, y)`.
    pub fn image(&mut self, image: PreparedImage, x: f32, y: f32, width: f32, height: f32) {
        self.images.push(image.into_stream());
        let name = format!("Im{}", self.images.len());

        let (w_pt, h_pt) = (mm(width), mm(height));
        let x_pt = mm(x);
        let y_pt = self.height_pt - mm(y) - h_pt;

        self.current_page().extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w_pt.into(), 0.into(), 0.into(), h_pt.into(), x_pt.into(), y_pt.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Build the standalone document.
    pub fn finish(self) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in [StandardFont::Helvetica, StandardFont::HelveticaBold] {
            let id = doc.add_object(standard_font_dict(font));
            fonts.set(font.resource_name(), Object::Reference(id));
        }
        if let (true, Some(font)) = (self.uses_embedded_font, self.font) {
            let id = font.embed(&mut doc);
            fonts.set(EMBEDDED_FONT_RESOURCE, Object::Reference(id));
        }

        let mut xobjects = Dictionary::new();
        for (index, stream) in self.images.into_iter().enumerate() {
            let id = doc.add_object(stream);
            xobjects.set(format!("Im{}", index + 1), Object::Reference(id));
        }

        let mut resources = Dictionary::from_iter([("Font", Object::Dictionary(fonts))]);
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let resources_id = doc.add_object(resources);

        let media_box = Object::Array(vec![
            0.into(),
            0.into(),
            self.width_pt.into(),
            self.height_pt.into(),
        ]);

        let mut kids = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations }.encode()?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("MediaBox", media_box.clone()),
                ("Resources", Object::Reference(resources_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        finish_page_tree(&mut doc, pages_id, kids);
        Ok(doc)
    }
}

fn standard_font_dict(font: StandardFont) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(font.base_font().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Insert the Pages node and Catalog, and point the trailer at them.
pub(crate) fn finish_page_tree(doc: &mut Document, pages_id: ObjectId, kids: Vec<Object>) {
    #[allow(clippy::cast_possible_wrap)]
    let count = kids.len() as i64;

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
}
