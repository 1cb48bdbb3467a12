//! Classification and grouping of the body files.
//!
//! Files are classified by URL extension, identity-document images are
//! grouped by label keyword and paired front/back, and everything is put
//! into a fixed order:
//!
//! 1. NID pages
//! 2. Passport pages
//! 3. other images, one per page, in input order
//! 4. PDF documents, in input order
//!
//! Labels are free text, so the grouping is a keyword heuristic. The rule
//! tables below are the whole of it.

use crate::model::FileReference;
use crate::util::url_extension;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// A label keyword that pulls images into a titled group.
struct GroupRule {
    keyword: &'static str,
    title: &'static str,
}

/// Groups in output order. The first matching rule wins.
const GROUP_RULES: &[GroupRule] = &[
    GroupRule {
        keyword: "nid",
        title: "NID",
    },
    GroupRule {
        keyword: "passport",
        title: "Passport",
    },
];

const FRONT_KEYWORDS: &[&str] = &["front", "first"];
const BACK_KEYWORDS: &[&str] = &["back", "second"];

/// What a file is, judged by its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    /// `None` for anything that is neither a known raster format nor a PDF.
    pub fn of(url: &str) -> Option<Self> {
        let ext = url_extension(url)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

/// Which side of a physical document an image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
    Document,
}

impl Side {
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if FRONT_KEYWORDS.iter().any(|k| label.contains(k)) {
            Self::Front
        } else if BACK_KEYWORDS.iter().any(|k| label.contains(k)) {
            Self::Back
        } else {
            Self::Document
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Front => "Front",
            Self::Back => "Back",
            Self::Document => "Document",
        }
    }
}

/// One image on an image page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMember {
    pub file: FileReference,
    pub side: Side,
}

/// One unit of body output, in final order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanItem {
    /// One page with one or two stacked images. `title` is the group title
    /// for identity documents and `None` for ungrouped images.
    Images {
        title: Option<&'static str>,
        members: Vec<ImageMember>,
    },
    /// A label page followed by every page of the document.
    Pdf(FileReference),
}

impl PlanItem {
    /// URLs this item needs fetched, in drawing order.
    pub fn urls(&self) -> Vec<&str> {
        match self {
            Self::Images { members, .. } => members.iter().map(|m| m.file.url.as_str()).collect(),
            Self::Pdf(file) => vec![file.url.as_str()],
        }
    }
}

impl ImageMember {
    /// Caption drawn above the image.
    pub fn caption(&self, title: Option<&str>) -> String {
        match title {
            Some(title) => format!("{title} ({})", self.side.as_str()),
            None => self.file.display_label().to_string(),
        }
    }
}

/// Classify, group and order `files`.
///
/// Files of unrecognised type are left out; the caller reports them.
pub fn plan(files: &[FileReference]) -> Vec<PlanItem> {
    let mut grouped: Vec<Vec<&FileReference>> = vec![Vec::new(); GROUP_RULES.len()];
    let mut singles = Vec::new();
    let mut pdfs = Vec::new();

    for file in files {
        match FileKind::of(&file.url) {
            Some(FileKind::Image) => {
                let label = file.label.to_lowercase();
                match GROUP_RULES.iter().position(|rule| label.contains(rule.keyword)) {
                    Some(index) => grouped[index].push(file),
                    None => singles.push(file),
                }
            }
            Some(FileKind::Pdf) => pdfs.push(file),
            None => {}
        }
    }

    let mut items = Vec::new();

    for (rule, members) in GROUP_RULES.iter().zip(grouped) {
        items.extend(group_pages(rule.title, &members));
    }

    items.extend(singles.into_iter().map(|file| PlanItem::Images {
        title: None,
        members: vec![ImageMember {
            file: file.clone(),
            side: Side::Document,
        }],
    }));

    items.extend(pdfs.into_iter().cloned().map(PlanItem::Pdf));
    items
}

/// The pair page for a group, then a page for each member not in the pair.
fn group_pages(title: &'static str, members: &[&FileReference]) -> Vec<PlanItem> {
    if members.is_empty() {
        return Vec::new();
    }

    let sides: Vec<Side> = members.iter().map(|f| Side::from_label(&f.label)).collect();
    let back = sides.iter().position(|&s| s == Side::Back);
    // Without a front side, the first other member takes the top slot.
    let front = sides
        .iter()
        .position(|&s| s == Side::Front)
        .or_else(|| (0..members.len()).find(|&i| Some(i) != back));

    let paired: Vec<usize> = front.into_iter().chain(back).collect();

    let member = |index: usize| ImageMember {
        file: members[index].clone(),
        side: sides[index],
    };

    let mut pages = vec![PlanItem::Images {
        title: Some(title),
        members: paired.iter().map(|&i| member(i)).collect(),
    }];

    pages.extend(
        (0..members.len())
            .filter(|i| !paired.contains(i))
            .map(|i| PlanItem::Images {
                title: Some(title),
                members: vec![member(i)],
            }),
    );

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(label: &str, url: &str) -> FileReference {
        FileReference::new(label, url)
    }

    fn captions(item: &PlanItem) -> Vec<String> {
        match item {
            PlanItem::Images { title, members } => members.iter().map(|m| m.caption(*title)).collect(),
            PlanItem::Pdf(file) => vec![format!("pdf:{}", file.label)],
        }
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::of("https://cdn/x/NID.JPG"), Some(FileKind::Image));
        assert_eq!(FileKind::of("https://cdn/x/photo.webp?sig=1"), Some(FileKind::Image));
        assert_eq!(FileKind::of("https://cdn/x/cv.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::of("https://cdn/x/cv.docx"), None);
        assert_eq!(FileKind::of("https://cdn/x/download"), None);
    }

    #[test]
    fn test_side_keywords() {
        assert_eq!(Side::from_label("NID (front)"), Side::Front);
        assert_eq!(Side::from_label("Passport first page"), Side::Front);
        assert_eq!(Side::from_label("NID BACK"), Side::Back);
        assert_eq!(Side::from_label("passport second page"), Side::Back);
        assert_eq!(Side::from_label("NID"), Side::Document);
    }

    #[test]
    fn test_full_order() {
        let files = vec![
            file("Resume / CV", "https://cdn/cv.pdf"),
            file("Certificate", "https://cdn/cert.png"),
            file("Passport (front)", "https://cdn/pp.jpg"),
            file("Agreement", "https://cdn/agreement.pdf"),
            file("NID (back)", "https://cdn/nid-b.jpg"),
            file("Notes", "https://cdn/notes.txt"),
            file("Photo", "https://cdn/photo.png"),
            file("NID (front)", "https://cdn/nid-f.jpg"),
        ];

        let plan = plan(&files);
        let rendered: Vec<Vec<String>> = plan.iter().map(captions).collect();
        assert_eq!(
            rendered,
            vec![
                vec!["NID (Front)".to_string(), "NID (Back)".to_string()],
                vec!["Passport (Front)".to_string()],
                vec!["Certificate".to_string()],
                vec!["Photo".to_string()],
                vec!["pdf:Resume / CV".to_string()],
                vec!["pdf:Agreement".to_string()],
            ]
        );
    }

    #[test]
    fn test_pair_independent_of_input_order() {
        let a = plan(&[file("NID (front)", "f.jpg"), file("NID (back)", "b.jpg")]);
        let b = plan(&[file("NID (back)", "b.jpg"), file("NID (front)", "f.jpg")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].urls(), vec!["f.jpg", "b.jpg"]);
    }

    #[test]
    fn test_generic_sides_and_leftovers() {
        let items = plan(&[
            file("NID scan", "one.png"),
            file("nid copy", "two.png"),
        ]);
        assert_eq!(items.len(), 2);
        assert_eq!(captions(&items[0]), vec!["NID (Document)".to_string()]);
        assert_eq!(items[1].urls(), vec!["two.png"]);
    }

    #[test]
    fn test_generic_member_pairs_with_back() {
        let items = plan(&[file("Passport (back)", "b.jpg"), file("Passport scan", "s.jpg")]);
        assert_eq!(items.len(), 1);
        assert_eq!(
            captions(&items[0]),
            vec!["Passport (Document)".to_string(), "Passport (Back)".to_string()]
        );
    }

    #[test]
    fn test_third_member_kept_after_pair() {
        let items = plan(&[
            file("NID (front)", "f.jpg"),
            file("NID (front) retake", "f2.jpg"),
            file("NID (back)", "b.jpg"),
            file("Passport (back)", "p.jpg"),
        ]);
        let urls: Vec<Vec<&str>> = items.iter().map(PlanItem::urls).collect();
        assert_eq!(urls, vec![vec!["f.jpg", "b.jpg"], vec!["f2.jpg"], vec!["p.jpg"]]);
    }

    #[test]
    fn test_nid_pdf_is_not_grouped() {
        let items = plan(&[file("NID (front)", "nid.pdf")]);
        assert!(matches!(&items[..], [PlanItem::Pdf(_)]));
    }

    #[test]
    fn test_empty() {
        assert!(plan(&[]).is_empty());
    }
}
