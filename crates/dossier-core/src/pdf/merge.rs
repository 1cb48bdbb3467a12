//! The output document and page splicing.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::canvas::finish_page_tree;
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Maximum page-tree depth walked for inherited attributes.
const MAX_TREE_DEPTH: usize = 10;

/// The merged output: an ordered list of pages appended to by splicing.
///
/// Pages keep the order they were spliced in, independent of object ids.
/// Embedded TrueType programs are stored once however many spliced
/// documents carry them.
pub struct MergedDocument {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    /// FontFile2 streams already in the output, by content hash.
    font_files: HashMap<u64, ObjectId>,
}

impl MergedDocument {
    pub fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
            font_files: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Append every page of `source`, in its own page order.
    ///
    /// Returns the number of pages added.
    pub fn splice(&mut self, mut source: Document) -> usize {
        source.renumber_objects_with(self.document.max_id + 1);

        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        if source_pages.is_empty() {
            return 0;
        }

        let mut pages = Vec::with_capacity(source_pages.len());
        for &page_id in &source_pages {
            let Ok(dict) = source.get_dictionary(page_id) else {
                tracing::warn!("Skipping unreadable page object {:?}", page_id);
                continue;
            };
            let mut dict = dict.clone();
            inline_inherited(&source, &mut dict);
            dict.set("Parent", Object::Reference(self.pages_id));
            pages.push((page_id, dict));
        }

        let shared = self.share_font_files(&mut source);
        let page_set: HashSet<ObjectId> = source_pages.iter().copied().collect();
        let max_id = source.max_id;

        for (object_id, object) in source.objects {
            if page_set.contains(&object_id) || shared.contains(&object_id) {
                continue;
            }
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.document.objects.insert(object_id, object);
                }
            }
        }

        let added = pages.len();
        for (page_id, dict) in pages {
            self.document.objects.insert(page_id, Object::Dictionary(dict));
            self.page_ids.push(page_id);
        }

        self.document.max_id = self.document.max_id.max(max_id);
        added
    }

    /// Point `source`'s font descriptors at identical FontFile2 programs
    /// already in the output. Returns the ids of the copies left unused.
    fn share_font_files(&mut self, source: &mut Document) -> HashSet<ObjectId> {
        let descriptors: Vec<(ObjectId, ObjectId)> = source
            .objects
            .iter()
            .filter_map(|(&id, object)| {
                let dict = object.as_dict().ok()?;
                if dict.get(b"Type").and_then(Object::as_name).ok()? != b"FontDescriptor" {
                    return None;
                }
                let file_id = dict.get(b"FontFile2").and_then(Object::as_reference).ok()?;
                Some((id, file_id))
            })
            .collect();

        let mut unused = HashSet::new();
        for (descriptor_id, file_id) in descriptors {
            let Ok(stream) = source.get_object(file_id).and_then(Object::as_stream) else {
                continue;
            };
            let key = content_hash(stream);

            let existing = self.font_files.get(&key).copied().filter(|&id| {
                self.document
                    .get_object(id)
                    .and_then(Object::as_stream)
                    .is_ok_and(|kept| same_stream(kept, stream))
            });

            match existing {
                Some(kept_id) => {
                    if let Ok(descriptor) = source
                        .get_object_mut(descriptor_id)
                        .and_then(Object::as_dict_mut)
                    {
                        descriptor.set("FontFile2", Object::Reference(kept_id));
                        unused.insert(file_id);
                    }
                }
                None => {
                    self.font_files.insert(key, file_id);
                }
            }
        }

        if !unused.is_empty() {
            tracing::debug!("Reused {} embedded font program(s)", unused.len());
        }
        unused
    }

    /// Finish the page tree and serialize.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let kids = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        finish_page_tree(&mut self.document, self.pages_id, kids);

        self.document.compress();

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;

        Ok(output)
    }
}

/// Parse a source PDF, rejecting encrypted and page-less documents.
pub fn open_pdf(bytes: &[u8], source_url: &str) -> Result<Document> {
    let source = Document::load_mem(bytes).map_err(|e| Error::PdfOpen {
        source_url: source_url.to_string(),
        reason: e.to_string(),
    })?;

    if source.is_encrypted() {
        return Err(Error::PdfOpen {
            source_url: source_url.to_string(),
            reason: "document is encrypted".to_string(),
        });
    }
    if source.get_pages().is_empty() {
        return Err(Error::PdfEmpty(source_url.to_string()));
    }

    Ok(source)
}

fn content_hash(stream: &Stream) -> u64 {
    let mut hasher = DefaultHasher::new();
    stream.content.hash(&mut hasher);
    hasher.finish()
}

fn same_stream(a: &Stream, b: &Stream) -> bool {
    a.content == b.content && a.dict.get(b"Filter").ok() == b.dict.get(b"Filter").ok()
}

impl Default for MergedDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy attributes the page inherits from its ancestors onto the page
/// itself, since the source page tree is not carried over.
fn inline_inherited(doc: &Document, page: &mut Dictionary) {
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = find_inherited(doc, page.get(b"Parent").ok(), key, MAX_TREE_DEPTH) {
            page.set(key, value);
        }
    }
}

fn find_inherited(doc: &Document, parent: Option<&Object>, key: &[u8], depth: usize) -> Option<Object> {
    if depth == 0 {
        return None;
    }

    let Some(Object::Reference(parent_id)) = parent else {
        return None;
    };
    let node = doc.get_dictionary(*parent_id).ok()?;

    match node.get(key) {
        Ok(value) => Some(value.clone()),
        Err(_) => find_inherited(doc, node.get(b"Parent").ok(), key, depth - 1),
    }
}
