//! TrueType font embedding for complex-script text.
//!
//! Bengali values are set in a runtime-loaded TrueType font embedded as a
//! CIDFont with Identity-H encoding, so each character is written as its
//! two-byte glyph id.
//!
//! # PDF Font Structure
//!
//! - **Type0 font**: the font resource a content stream selects, referencing:
//!   - **CIDFontType2**: per-glyph widths, referencing:
//!     - **FontDescriptor**: metrics and flags
//!     - **FontFile2**: the TrueType program itself
//!   - **ToUnicode CMap**: glyph id to Unicode, for copy/paste and search
//!
//! Glyph lookup is character to glyph only. There is no OpenType shaping, so
//! conjuncts and reordered vowel signs appear in logical order.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use crate::error::{Error, Result};

/// Code point ranges whose glyphs and widths are captured at load time.
const COVERED_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007E), // Basic Latin
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0980, 0x09FF), // Bengali
    (0x200C, 0x200D), // ZWNJ, ZWJ
    (0x2010, 0x2027), // dashes, quotes, bullets, ellipsis
    (0x20B9, 0x20B9), // Indian rupee sign
    (0x25CC, 0x25CC), // dotted circle
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    id: u16,
    advance: u16,
}

/// A parsed TrueType font ready to be embedded into generated pages.
///
/// `ttf_parser::Face` borrows its input, so everything needed after parsing
/// is copied out up front and the raw bytes are kept only for FontFile2.
#[derive(Clone)]
pub struct EmbeddedFont {
    family: String,
    data: Vec<u8>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    glyphs: HashMap<char, Glyph>,
    notdef_advance: u16,
}

impl EmbeddedFont {
    /// Parse font bytes fetched at runtime.
    pub fn from_bytes(family: &str, data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| Error::FontParse(e.to_string()))?;

        let mut glyphs = HashMap::new();
        for &(start, end) in COVERED_RANGES {
            for c in (start..=end).filter_map(char::from_u32) {
                if let Some(gid) = face.glyph_index(c) {
                    let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                    glyphs.insert(c, Glyph { id: gid.0, advance });
                }
            }
        }

        if !glyphs.keys().any(|&c| crate::text::is_bengali(c)) {
            tracing::warn!("Font '{}' has no Bengali glyphs", family);
        }

        let bbox = face.global_bounding_box();
        let font = Self {
            family: family.to_string(),
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            notdef_advance: face.glyph_hor_advance(GlyphId(0)).unwrap_or(0),
            glyphs,
            data,
        };

        tracing::debug!(
            "Parsed font '{}': {} glyphs mapped, {} units/em",
            font.family,
            font.glyphs.len(),
            font.units_per_em
        );
        Ok(font)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Whether the font maps this character to a real glyph.
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyphs.contains_key(&c)
    }

    /// Glyph id for a character, .notdef (0) when unmapped.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyphs.get(&c).map_or(0, |g| g.id)
    }

    fn advance(&self, c: char) -> u16 {
        self.glyphs.get(&c).map_or(self.notdef_advance, |g| g.advance)
    }

    /// Width of `text` in points at `font_size`.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        if self.units_per_em == 0 {
            return 0.0;
        }
        let units: u32 = text.chars().map(|c| u32::from(self.advance(c))).sum();
        units as f32 * font_size / f32::from(self.units_per_em)
    }

    /// Two bytes per character, big-endian glyph ids, for an Identity-H `Tj`.
    pub fn encode_glyphs(&self, text: &str) -> Vec<u8> {
        text.chars()
            .flat_map(|c| self.glyph_id(c).to_be_bytes())
            .collect()
    }

    /// PostScript-safe base font name.
    fn base_font(&self) -> Vec<u8> {
        let name: String = self
            .family
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        if name.is_empty() {
            b"EmbeddedFont".to_vec()
        } else {
            name.into_bytes()
        }
    }

    /// Add all font objects to `doc`; returns the Type0 font to reference
    /// from a page's /Font resources.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let font_file_id = self.create_font_file(doc);
        let descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, descriptor_id);
        let to_unicode_id = self.create_to_unicode_cmap(doc);
        self.create_type0_font(doc, cid_font_id, to_unicode_id)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Length1", Object::Integer(self.data.len() as i64));

        let stream = Stream::new(dict, self.data.clone()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(self.base_font())),
            (
                "FontFamily",
                Object::String(self.family.as_bytes().to_vec(), StringFormat::Literal),
            ),
            ("Flags", Object::Integer(32)),
            (
                "FontBBox",
                Object::Array(self.bbox.iter().map(|&v| Object::Integer(i64::from(v))).collect()),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(self.ascender))),
            ("Descent", Object::Integer(i64::from(self.descender))),
            ("CapHeight", Object::Integer(i64::from(self.cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    fn create_cid_font(&self, doc: &mut Document, descriptor_id: ObjectId) -> ObjectId {
        let default_width = self.scale_width(self.advance(' '));

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.base_font())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(self.build_widths_array())),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// Font units to the 1000-unit glyph space.
    fn scale_width(&self, width: u16) -> i64 {
        if self.units_per_em == 0 {
            return 0;
        }
        i64::from(width) * 1000 / i64::from(self.units_per_em)
    }

    /// W array: `[gid [w1 w2 ...]]` for each run of consecutive glyph ids.
    fn build_widths_array(&self) -> Vec<Object> {
        let gid_widths: BTreeMap<u16, i64> = self
            .glyphs
            .values()
            .filter(|g| g.id != 0)
            .map(|g| (g.id, self.scale_width(g.advance)))
            .collect();

        let mut result = Vec::new();
        let mut iter = gid_widths.iter().peekable();

        while let Some((&first_gid, &first_width)) = iter.next() {
            let mut widths = vec![Object::Integer(first_width)];
            let mut expected_next = first_gid.wrapping_add(1);

            while let Some(&(&gid, &width)) = iter.peek() {
                if gid != expected_next {
                    break;
                }
                widths.push(Object::Integer(width));
                expected_next = expected_next.wrapping_add(1);
                iter.next();
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// ToUnicode CMap body with one bfchar entry per mapped glyph.
    fn to_unicode_cmap(&self) -> String {
        let mut by_gid: BTreeMap<u16, char> = BTreeMap::new();
        for (&c, glyph) in &self.glyphs {
            if glyph.id != 0 {
                by_gid
                    .entry(glyph.id)
                    .and_modify(|existing| *existing = (*existing).min(c))
                    .or_insert(c);
            }
        }

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );

        let entries: Vec<(u16, char)> = by_gid.into_iter().collect();
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, c) in chunk {
                let mut units = [0u16; 2];
                let hex: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{gid:04X}> <{hex}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap
    }

    fn create_to_unicode_cmap(&self, doc: &mut Document) -> ObjectId {
        let stream = Stream::new(Dictionary::new(), self.to_unicode_cmap().into_bytes())
            .with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    fn create_type0_font(
        &self,
        doc: &mut Document,
        cid_font_id: ObjectId,
        to_unicode_id: ObjectId,
    ) -> ObjectId {
        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.base_font())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("family", &self.family)
            .field("bytes", &self.data.len())
            .field("glyphs", &self.glyphs.len())
            .field("units_per_em", &self.units_per_em)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod tests {
    use super::*;

    /// A font with a handful of glyphs and no real font program, enough to
    /// exercise metrics and the PDF objects.
    pub(crate) fn synthetic_font() -> EmbeddedFont {
        let glyphs = [
            (' ', 3, 250),
            ('a', 4, 500),
            ('b', 5, 500),
            ('ক', 10, 600),
            ('া', 11, 300),
            ('ম', 12, 600),
            ('ন', 13, 600),
        ]
        .into_iter()
        .map(|(c, id, advance)| (c, Glyph { id, advance }))
        .collect();

        EmbeddedFont {
            family: "Solaiman Lipi".to_string(),
            data: vec![0; 16],
            units_per_em: 1000,
            ascender: 900,
            descender: -300,
            cap_height: 700,
            bbox: [-100, -300, 1000, 900],
            glyphs,
            notdef_advance: 500,
        }
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        let result = EmbeddedFont::from_bytes("Broken", b"not a font".to_vec());
        assert!(matches!(result, Err(Error::FontParse(_))));
    }

    #[test]
    fn test_string_width() {
        let font = synthetic_font();
        // 600 + 300 units at 10pt, 1000 units/em
        assert!((font.string_width("কা", 10.0) - 9.0).abs() < 0.001);
        // unmapped characters use the .notdef advance
        assert!((font.string_width("z", 10.0) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_encode_glyphs() {
        let font = synthetic_font();
        assert_eq!(font.encode_glyphs("কa"), vec![0x00, 0x0A, 0x00, 0x04]);
        assert_eq!(font.encode_glyphs("?"), vec![0x00, 0x00]);
    }

    #[test]
    fn test_widths_array_groups_runs() {
        let font = synthetic_font();
        let w = font.build_widths_array();
        // runs: 3..=5 and 10..=13
        assert_eq!(w.len(), 4);
        assert_eq!(w[0], Object::Integer(3));
        assert_eq!(w[2], Object::Integer(10));
        match &w[3] {
            Object::Array(widths) => assert_eq!(widths.len(), 4),
            other => panic!("expected width run, got {other:?}"),
        }
    }

    #[test]
    fn test_to_unicode_maps_bengali() {
        let cmap = synthetic_font().to_unicode_cmap();
        assert!(cmap.contains("7 beginbfchar"));
        assert!(cmap.contains("<000A> <0995>"));
        assert!(cmap.contains("<0004> <0061>"));
    }

    #[test]
    fn test_embed_creates_type0_font() {
        let font = synthetic_font();
        let mut doc = Document::with_version("1.5");
        let font_id = font.embed(&mut doc);

        let dict = doc.get_dictionary(font_id).unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap(), &Object::Name(b"Type0".to_vec()));
        assert_eq!(dict.get(b"BaseFont").unwrap(), &Object::Name(b"SolaimanLipi".to_vec()));
        assert_eq!(doc.objects.len(), 5);
    }

    #[test]
    fn test_system_font_if_present() {
        let Ok(bytes) = std::fs::read("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf") else {
            return;
        };
        let font = EmbeddedFont::from_bytes("DejaVu Sans", bytes).unwrap();
        assert!(font.has_glyph('A'));
        assert!(font.string_width("Dhaka", 12.0) > 0.0);
    }
}
