use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{configuration::FontCandidate, error::ContextError};

/// The built-in family used when no TrueType family could be registered.
pub const FALLBACK_FONT_FAMILY: &str = "Helvetica";

/// Millimeters in one typographic point.
const MILLIMETERS_PER_POINT: f32 = 25.4 / 72.0;

/// The styles a resume is typeset with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 3] = [FontStyle::Regular, FontStyle::Bold, FontStyle::Italic];

    /// The name of the matching standard Type1 font.
    pub fn standard_base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic => "Helvetica-Oblique",
        }
    }
}

/// The (insofar) relevant vertical metrics of a font, in font units.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontMetrics {
    pub ascent: i16,
    pub descent: i16,
    pub units_per_em: u16,
}

/// A font face loaded from a TTF font file, together with the bytes it was parsed from
/// so that it can later be embedded into the PDF document.
#[derive(Clone, Debug)]
pub struct TrueTypeFace {
    inner: Arc<OwnedFace>,
    bytes: Arc<Vec<u8>>,
    units_per_em: u16,
}

impl TrueTypeFace {
    /// Constructs a font face from the raw data of a TTF font file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data.clone(), 0)
            .map_err(|error| ContextError::with_error("Failed to parse font", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            inner: Arc::new(face),
            bytes: Arc::new(data),
            units_per_em,
        })
    }

    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(format!("Failed to read the font {:?}", font_path), &error)
        })?;

        TrueTypeFace::from_bytes(font_bytes).map_err(|error| ContextError {
            context: format!("{} {:?}", error.context, font_path),
            source_error: error.source_error,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    /// The box enclosing every glyph, as `[x_min, y_min, x_max, y_max]` in font units.
    pub fn bounding_box(&self) -> [i16; 4] {
        let bounding_box = self.face().global_bounding_box();
        [
            bounding_box.x_min,
            bounding_box.y_min,
            bounding_box.x_max,
            bounding_box.y_max,
        ]
    }

    /// The slant of the face in degrees, counterclockwise from the vertical.
    pub fn italic_angle(&self) -> f32 {
        self.face().italic_angle().unwrap_or(0.0)
    }

    /// Retrieve the glyph ID of a character, if the font has one.
    pub fn glyph_id(&self, character: char) -> Option<u16> {
        self.face()
            .glyph_index(character)
            .map(|glyph_id| glyph_id.0)
    }

    /// The horizontal advance of a glyph, in font units.
    pub fn glyph_advance(&self, glyph_id: u16) -> Option<u16> {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
    }

    pub fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    /// Retrieve the mapping between the glyph IDs and the characters they were reached from,
    /// walking every Unicode subtable of the font.
    pub fn glyph_ids(&self) -> HashMap<u16, char> {
        let font_subtables = self.face().tables().cmap.map(|cmap| {
            cmap.subtables
                .into_iter()
                .filter(|font_subtable| font_subtable.is_unicode())
        });
        let Some(font_subtables) = font_subtables else {
            return HashMap::new();
        };

        let mut gid_to_character_map =
            HashMap::with_capacity(self.face().number_of_glyphs().into());
        for font_subtable in font_subtables {
            font_subtable.codepoints(|codepoint| {
                let Some(character) = char::from_u32(codepoint) else {
                    return;
                };
                // Glyph 0 is .notdef and never maps back to a character
                if let Some(glyph_index) = font_subtable
                    .glyph_index(codepoint)
                    .filter(|index| index.0 > 0)
                {
                    gid_to_character_map
                        .entry(glyph_index.0)
                        .or_insert(character);
                }
            })
        }

        gid_to_character_map
    }

    /// The width of the text in millimeters when set at the given size in points.
    fn text_width(&self, font_size: f32, text: &str) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|character| self.glyph_id(character))
            .filter_map(|glyph_id| self.glyph_advance(glyph_id))
            .map(u32::from)
            .sum();

        units as f32 * font_size / self.units_per_em as f32 * MILLIMETERS_PER_POINT
    }

    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }
}

/// The three faces of a registered TrueType family.
#[derive(Clone, Debug)]
pub struct StyledFaces {
    pub regular: TrueTypeFace,
    pub bold: TrueTypeFace,
    pub italic: TrueTypeFace,
}

impl StyledFaces {
    pub fn face(&self, font_style: FontStyle) -> &TrueTypeFace {
        match font_style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// The family every piece of text of the resume is set in, as decided once per run.
#[derive(Clone, Debug)]
pub struct ResolvedFont {
    pub family: String,
    /// Whether the family covers Unicode; the standard family only covers ASCII.
    pub unicode_capable: bool,
    faces: Option<StyledFaces>,
}

impl ResolvedFont {
    /// The built-in standard family, with ASCII-only glyph coverage.
    pub fn standard() -> Self {
        ResolvedFont {
            family: FALLBACK_FONT_FAMILY.to_string(),
            unicode_capable: false,
            faces: None,
        }
    }

    pub fn true_type(family: String, faces: StyledFaces) -> Self {
        ResolvedFont {
            family,
            unicode_capable: true,
            faces: Some(faces),
        }
    }

    /// The TrueType faces, `None` for the standard family.
    pub fn faces(&self) -> Option<&StyledFaces> {
        self.faces.as_ref()
    }

    /// The width of the text in millimeters when set in the given style and size in points.
    pub fn text_width(&self, font_style: FontStyle, font_size: f32, text: &str) -> f32 {
        match &self.faces {
            Some(faces) => faces.face(font_style).text_width(font_size, text),
            None => {
                let units: u32 = text
                    .chars()
                    .filter_map(|character| standard_character_width(font_style, character))
                    .map(u32::from)
                    .sum();
                units as f32 * font_size / 1000.0 * MILLIMETERS_PER_POINT
            }
        }
    }
}

/// Registers the first candidate family whose regular, bold and italic faces all load.
/// When none does, the standard family is returned and a warning is logged: the run goes on
/// but non-ASCII characters will be missing from the document.
pub fn resolve_font(font_candidates: &[FontCandidate]) -> ResolvedFont {
    let mut last_error = None;
    for font_candidate in font_candidates {
        match load_styled_faces(font_candidate) {
            Ok(faces) => {
                log::info!(
                    "Registered the font family {:?} from {:?}",
                    font_candidate.font_family,
                    font_candidate.regular_font_path
                );
                return ResolvedFont::true_type(font_candidate.font_family.clone(), faces);
            }
            Err(error) => {
                log::debug!(
                    "Unable to register the font family {:?}: {}",
                    font_candidate.font_family,
                    error
                );
                last_error = Some(error);
            }
        }
    }

    match last_error {
        Some(error) => log::warn!(
            "Could not load a TrueType font ({}). Falling back to {} (Unicode characters will be dropped)",
            error,
            FALLBACK_FONT_FAMILY
        ),
        None => log::warn!(
            "No TrueType font configured. Falling back to {} (Unicode characters will be dropped)",
            FALLBACK_FONT_FAMILY
        ),
    }

    ResolvedFont::standard()
}

fn load_styled_faces(font_candidate: &FontCandidate) -> Result<StyledFaces, ContextError> {
    Ok(StyledFaces {
        regular: TrueTypeFace::from_path(&font_candidate.regular_font_path)?,
        bold: TrueTypeFace::from_path(&font_candidate.bold_font_path)?,
        italic: TrueTypeFace::from_path(&font_candidate.italic_font_path)?,
    })
}

/// The advance width (per 1000 units of em) of a printable ASCII character in the standard
/// family, `None` for everything outside of printable ASCII.
pub fn standard_character_width(font_style: FontStyle, character: char) -> Option<u16> {
    let index = (character as u32).checked_sub(0x20)? as usize;
    let widths = match font_style {
        FontStyle::Bold => &HELVETICA_BOLD_WIDTHS,
        FontStyle::Regular | FontStyle::Italic => &HELVETICA_WIDTHS,
    };

    widths.get(index).copied()
}

/// Widths of the characters from ' ' to '~' in Helvetica (and Helvetica-Oblique).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Widths of the characters from ' ' to '~' in Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{resolve_font, standard_character_width, FontStyle, FALLBACK_FONT_FAMILY};
    use crate::configuration::{FontCandidate, PREFERRED_FONT_FAMILY};

    fn missing_candidate(directory: &std::path::Path) -> FontCandidate {
        FontCandidate {
            font_family: PREFERRED_FONT_FAMILY.to_string(),
            regular_font_path: directory.join("arial.ttf"),
            bold_font_path: directory.join("arialbd.ttf"),
            italic_font_path: directory.join("ariali.ttf"),
        }
    }

    #[test]
    fn missing_font_files_fall_back_to_the_standard_family() {
        let directory = tempfile::tempdir().unwrap();

        let font = resolve_font(&[missing_candidate(directory.path())]);

        assert_eq!(font.family, FALLBACK_FONT_FAMILY);
        assert_ne!(font.family, PREFERRED_FONT_FAMILY);
        assert!(!font.unicode_capable);
        assert!(font.faces().is_none());
    }

    #[test]
    fn unparsable_font_files_fall_back_to_the_standard_family() {
        let directory = tempfile::tempdir().unwrap();
        let candidate = missing_candidate(directory.path());
        for path in [
            &candidate.regular_font_path,
            &candidate.bold_font_path,
            &candidate.italic_font_path,
        ] {
            std::fs::write(path, b"definitely not a TrueType font").unwrap();
        }

        let font = resolve_font(&[candidate]);

        assert_eq!(font.family, FALLBACK_FONT_FAMILY);
        assert!(!font.unicode_capable);
    }

    #[test]
    fn no_candidates_fall_back_to_the_standard_family() {
        let font = resolve_font(&[]);

        assert_eq!(font.family, FALLBACK_FONT_FAMILY);
    }

    #[test]
    fn standard_family_measures_ascii_only() {
        let font = resolve_font(&[FontCandidate {
            font_family: PREFERRED_FONT_FAMILY.to_string(),
            regular_font_path: PathBuf::from("/nonexistent/regular.ttf"),
            bold_font_path: PathBuf::from("/nonexistent/bold.ttf"),
            italic_font_path: PathBuf::from("/nonexistent/italic.ttf"),
        }]);

        assert_eq!(standard_character_width(FontStyle::Regular, '\u{2022}'), None);
        assert_eq!(standard_character_width(FontStyle::Regular, '\n'), None);
        assert_eq!(standard_character_width(FontStyle::Regular, 'A'), Some(667));
        assert_eq!(standard_character_width(FontStyle::Bold, 'b'), Some(611));
        assert_eq!(standard_character_width(FontStyle::Italic, '~'), Some(584));

        // 1000 units at 10pt is 10pt, so 3.5277 mm
        let width = font.text_width(FontStyle::Regular, 10.0, "MMMM\u{2022}");
        assert!((width - 4.0 * 0.833 * 10.0 * 25.4 / 72.0).abs() < 1e-3);
        assert!(
            font.text_width(FontStyle::Bold, 10.0, "resume")
                > font.text_width(FontStyle::Regular, 10.0, "resume")
        );
    }
}
