//! Generated body pages: stacked image pages and PDF label pages.

use lopdf::Document;
use tracing::warn;

use crate::classify::ImageMember;
use crate::config::PageSize;
use crate::error::{Error, Result};
use crate::model::FileReference;
use crate::pdf::{EmbeddedFont, PageCanvas, PreparedImage, TextStyle, fit_within};

const MARGIN: f32 = 10.0;
const CAPTION_SIZE: f32 = 10.0;
/// Vertical space reserved per image for its caption and the gap below.
const CAPTION_BAND: f32 = 20.0;
const CAPTION_BASELINE: f32 = 5.0;
const IMAGE_OFFSET: f32 = 10.0;
const IMAGE_SPACING: f32 = 30.0;

const LABEL_PAGE_SIZE: f32 = 14.0;
const LABEL_PAGE_BASELINE: f32 = 30.0;
const LABEL_PAGE_MARGIN: f32 = 15.0;
const LABEL_LINE_HEIGHT: f32 = 7.0;

/// Result of rendering one image page.
#[derive(Debug)]
pub struct ImagePage {
    /// `None` when no member could be drawn.
    pub document: Option<Document>,
    pub included: Vec<FileReference>,
    pub failed: Vec<(FileReference, Error)>,
}

/// Renders image pages and label pages in one page size and font.
pub struct PageRenderer<'a> {
    page_size: PageSize,
    font: Option<&'a EmbeddedFont>,
}

impl<'a> PageRenderer<'a> {
    pub const fn new(page_size: PageSize, font: Option<&'a EmbeddedFont>) -> Self {
        Self { page_size, font }
    }

    /// Lay out up to two images stacked vertically, each under its caption.
    ///
    /// Every planned member gets an equal share of the page height, so a
    /// member that fails to decode leaves the others where they would be.
    pub fn image_page(
        &self,
        title: Option<&str>,
        members: Vec<(ImageMember, Vec<u8>)>,
        planned: usize,
    ) -> Result<ImagePage> {
        let mut canvas = PageCanvas::new(self.page_size, self.font);
        let page_width = canvas.page_width();
        let slots = planned.max(members.len()).max(1) as f32;

        let max_width = page_width - MARGIN * 2.0;
        let max_height = (canvas.page_height() - MARGIN * 3.0 - slots * CAPTION_BAND) / slots;
        let caption_style = TextStyle::new(CAPTION_SIZE).bold();

        let mut included = Vec::new();
        let mut failed = Vec::new();
        let mut y = MARGIN;

        for (member, bytes) in members {
            let image = match PreparedImage::decode(&bytes, &member.file.url) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Leaving '{}' off its page: {}", member.file.display_label(), e);
                    failed.push((member.file, e));
                    continue;
                }
            };

            let (px_width, px_height) = image.dimensions();
            let (width, height) =
                fit_within(px_width as f32, px_height as f32, max_width, max_height);

            canvas.text_centered(&member.caption(title), y + CAPTION_BASELINE, &caption_style);
            canvas.image(image, (page_width - width) / 2.0, y + IMAGE_OFFSET, width, height);
            y += height + IMAGE_SPACING;

            included.push(member.file);
        }

        let document = if included.is_empty() {
            None
        } else {
            Some(canvas.finish()?)
        };

        Ok(ImagePage {
            document,
            included,
            failed,
        })
    }

    /// A page carrying only `caption`, placed before a spliced PDF.
    pub fn label_page(&self, caption: &str) -> Result<Document> {
        let mut canvas = PageCanvas::new(self.page_size, self.font);
        let style = TextStyle::new(LABEL_PAGE_SIZE).bold();
        let max_width = canvas.page_width() - LABEL_PAGE_MARGIN * 2.0;

        let mut y = LABEL_PAGE_BASELINE;
        for line in canvas.wrap(caption, &style, max_width) {
            canvas.text_centered(&line, y, &style);
            y += LABEL_LINE_HEIGHT;
        }

        canvas.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classify::Side;
    use crate::pdf::page_texts;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use lopdf::content::Content;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 30, 90])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn member(label: &str, url: &str, side: Side) -> ImageMember {
        ImageMember {
            file: FileReference::new(label, url),
            side,
        }
    }

    fn save(mut doc: Document) -> Vec<u8> {
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    /// Width and height of each `cm` image placement on page 1, in points.
    fn placements(bytes: &[u8]) -> Vec<(f32, f32)> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let ops = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap().operations;
        ops.iter()
            .filter(|op| op.operator == "cm")
            .map(|op| (op.operands[0].as_float().unwrap(), op.operands[3].as_float().unwrap()))
            .collect()
    }

    #[test]
    fn test_pair_page() {
        let renderer = PageRenderer::new(PageSize::A4, None);
        let page = renderer
            .image_page(
                Some("NID"),
                vec![
                    (member("NID (front)", "f.png", Side::Front), png(40, 25)),
                    (member("NID (back)", "b.png", Side::Back), png(40, 25)),
                ],
                2,
            )
            .unwrap();

        assert_eq!(page.included.len(), 2);
        assert!(page.failed.is_empty());

        let bytes = save(page.document.unwrap());
        assert_eq!(page_texts(&bytes), ["NID (Front) NID (Back)"]);
        assert_eq!(placements(&bytes).len(), 2);
    }

    #[test]
    fn test_undecodable_member_skipped() {
        let renderer = PageRenderer::new(PageSize::A4, None);
        let page = renderer
            .image_page(
                Some("NID"),
                vec![
                    (member("NID (front)", "f.png", Side::Front), png(40, 25)),
                    (member("NID (back)", "b.png", Side::Back), b"not an image".to_vec()),
                ],
                2,
            )
            .unwrap();

        assert_eq!(page.included.len(), 1);
        assert_eq!(page.failed.len(), 1);
        assert_eq!(page.failed[0].0.url, "b.png");

        let bytes = save(page.document.unwrap());
        assert_eq!(page_texts(&bytes), ["NID (Front)"]);
    }

    #[test]
    fn test_all_members_failed_gives_no_page() {
        let renderer = PageRenderer::new(PageSize::A4, None);
        let page = renderer
            .image_page(None, vec![(member("Photo", "p.png", Side::Document), vec![])], 1)
            .unwrap();
        assert!(page.document.is_none());
        assert_eq!(page.failed.len(), 1);
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let renderer = PageRenderer::new(PageSize::A4, None);
        let page = renderer
            .image_page(None, vec![(member("Tall", "t.png", Side::Document), png(30, 40))], 1)
            .unwrap();

        let bytes = save(page.document.unwrap());
        let (w, h) = placements(&bytes)[0];
        assert!((w / h - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_label_page() {
        let renderer = PageRenderer::new(PageSize::A4, None);
        let bytes = save(renderer.label_page("Resume / CV").unwrap());
        assert_eq!(page_texts(&bytes), ["Resume / CV"]);
    }
}
