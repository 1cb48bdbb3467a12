//! Script-aware text layout: which face sets a run of text, and how it wraps.
//!
//! A run containing any Bengali code point is a complex-script run. It is set
//! in the embedded font when one loaded, otherwise in Helvetica (Bengali then
//! renders as '?', which is accepted). Everything else is set in Helvetica.

use crate::pdf::{EmbeddedFont, StandardFont};

/// Bengali Unicode block.
const BENGALI: std::ops::RangeInclusive<u32> = 0x0980..=0x09FF;

pub fn is_bengali(c: char) -> bool {
    BENGALI.contains(&u32::from(c))
}

/// Whether the run needs the complex-script font.
pub fn contains_bengali(text: &str) -> bool {
    text.chars().any(is_bengali)
}

/// The face chosen for one run of text.
#[derive(Debug, Clone, Copy)]
pub enum Face<'a> {
    Standard(StandardFont),
    Embedded(&'a EmbeddedFont),
}

impl<'a> Face<'a> {
    /// Pick the face for `text`. The embedded font has a single weight, so
    /// `bold` only affects simple-script runs.
    pub fn select(text: &str, bold: bool, embedded: Option<&'a EmbeddedFont>) -> Self {
        match embedded {
            Some(font) if contains_bengali(text) => Self::Embedded(font),
            _ => Self::Standard(StandardFont::for_weight(bold)),
        }
    }

    /// Width of `text` in points.
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Self::Standard(font) => font.string_width(text, font_size),
            Self::Embedded(font) => font.string_width(text, font_size),
        }
    }

    pub const fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }
}

/// Wrap `text` to `max_width` points, dispatching on script.
pub fn wrap(text: &str, face: &Face<'_>, font_size: f32, max_width: f32) -> Vec<String> {
    if contains_bengali(text) {
        wrap_words(text, face, font_size, max_width)
    } else {
        wrap_breaking(text, face, font_size, max_width)
    }
}

/// Greedy word wrap that never splits a word.
///
/// A word wider than `max_width` gets a line of its own. Joining the lines
/// with single spaces gives back the whitespace-normalised input.
pub fn wrap_words(text: &str, face: &Face<'_>, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{current} {word}");
        if face.string_width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

/// Greedy wrap for Latin text that breaks over-long words by character,
/// and honours explicit newlines.
pub fn wrap_breaking(text: &str, face: &Face<'_>, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if face.string_width(&candidate, font_size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if face.string_width(word, font_size) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if face.string_width(&current, font_size) > max_width {
                        current.pop();
                        if current.is_empty() {
                            // Single glyph wider than the box
                            current.push(c);
                            continue;
                        }
                        lines.push(std::mem::replace(&mut current, c.to_string()));
                    }
                }
            }
        }

        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::font::tests::synthetic_font;

    const HELVETICA: Face<'static> = Face::Standard(StandardFont::Helvetica);

    #[test]
    fn test_bengali_detection() {
        assert!(contains_bengali("মোঃ করিম"));
        assert!(contains_bengali("House 12, ঢাকা"));
        assert!(!contains_bengali("Dhaka"));
        assert!(!contains_bengali(""));
    }

    #[test]
    fn test_face_selection() {
        let font = synthetic_font();
        assert!(Face::select("ঢাকা", false, Some(&font)).is_embedded());
        assert!(!Face::select("Dhaka", false, Some(&font)).is_embedded());
        assert!(matches!(
            Face::select("ঢাকা", true, None),
            Face::Standard(StandardFont::HelveticaBold)
        ));
    }

    #[test]
    fn test_bengali_wrap_preserves_words() {
        let font = synthetic_font();
        let face = Face::Embedded(&font);
        let text = "কা মন কাকা মনমন কা মন";

        let lines = wrap(text, &face, 10.0, 20.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_long_word_gets_own_line_unsplit() {
        let font = synthetic_font();
        let face = Face::Embedded(&font);
        let long = "কাকাকাকাকাকাকাকা";

        let lines = wrap_words(&format!("মন {long} কা"), &face, 10.0, 15.0);
        assert_eq!(lines, vec!["মন".to_string(), long.to_string(), "কা".to_string()]);
    }

    #[test]
    fn test_wrap_words_never_empty() {
        let font = synthetic_font();
        let lines = wrap_words("", &Face::Embedded(&font), 10.0, 50.0);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn test_latin_wrap_fits_width() {
        let text = "House 14, Road 7, Block C, Mirpur Section 10, Dhaka North City Corporation";
        let lines = wrap(text, &HELVETICA, 10.0, 120.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(HELVETICA.string_width(line, 10.0) <= 120.0, "line too wide: {line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_latin_wrap_breaks_long_word() {
        let lines = wrap_breaking("https://files.example.com/uploads/very-long-name.pdf", &HELVETICA, 10.0, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "https://files.example.com/uploads/very-long-name.pdf");
    }

    #[test]
    fn test_latin_wrap_keeps_newlines() {
        let lines = wrap_breaking("first\nsecond", &HELVETICA, 10.0, 500.0);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }
}
