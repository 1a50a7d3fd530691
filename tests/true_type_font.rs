use std::path::{Path, PathBuf};

use resumr::{
    composer::generate_resume_at,
    configuration::{ComposerConfiguration, FontCandidate},
    document::Operation,
    fonts::{resolve_font, TrueTypeFace},
};
use time::macros::datetime;

/// Font families commonly installed on Linux hosts, as (family, directory, regular, bold, italic).
const HOST_FAMILIES: [(&str, &str, &str, &str, &str); 2] = [
    (
        "DejaVuSans",
        "/usr/share/fonts/truetype/dejavu",
        "DejaVuSans.ttf",
        "DejaVuSans-Bold.ttf",
        "DejaVuSans-Oblique.ttf",
    ),
    (
        "LiberationSans",
        "/usr/share/fonts/truetype/liberation",
        "LiberationSans-Regular.ttf",
        "LiberationSans-Bold.ttf",
        "LiberationSans-Italic.ttf",
    ),
];

fn host_font_candidate() -> Option<FontCandidate> {
    HOST_FAMILIES
        .iter()
        .map(|(font_family, directory, regular, bold, italic)| {
            let directory = Path::new(directory);
            FontCandidate {
                font_family: font_family.to_string(),
                regular_font_path: directory.join(regular),
                bold_font_path: directory.join(bold),
                italic_font_path: directory.join(italic),
            }
        })
        .find(|font_candidate| {
            font_candidate.regular_font_path.is_file()
                && font_candidate.bold_font_path.is_file()
                && font_candidate.italic_font_path.is_file()
        })
}

fn stream_text(parsed: &lopdf::Document, stream_id: lopdf::ObjectId) -> String {
    let stream = parsed.get_object(stream_id).unwrap().as_stream().unwrap();
    let bytes = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[test]
fn true_type_family_is_embedded_with_unicode_text() {
    let Some(font_candidate) = host_font_candidate() else {
        eprintln!("No TrueType family found on the host, skipping");
        return;
    };
    let directory = tempfile::tempdir().unwrap();
    let configuration = ComposerConfiguration {
        content_directory: directory.path().join("content"),
        photo_subdirectory: PathBuf::from("photo"),
        output_directory: directory.path().join("resumes"),
        font_candidates: vec![font_candidate.clone()],
    };
    std::fs::create_dir_all(&configuration.content_directory).unwrap();
    for (file_name, text) in [
        ("header.txt", "Jane Doe"),
        ("summary.txt", "Café"),
        ("experience_1.txt", "Lead @ Acme\n- Café leadership"),
    ] {
        std::fs::write(configuration.content_directory.join(file_name), text).unwrap();
    }

    let font = resolve_font(&configuration.font_candidates);
    assert!(font.unicode_capable);
    assert_eq!(font.family, font_candidate.font_family);

    let generated_resume =
        generate_resume_at(&configuration, datetime!(2026-10-18 09:05:03 UTC)).unwrap();
    let document = &generated_resume.document;
    assert_eq!(document.font_family, font_candidate.font_family);
    assert!(document.operations.iter().any(|operation| matches!(
        operation,
        Operation::UnicodeText { text_string, .. } if text_string == "\u{2022} Cafe\u{301} leadership"
    )));

    let parsed = lopdf::Document::load(&generated_resume.output_path).unwrap();
    let pages = parsed.get_pages();
    assert_eq!(pages.len(), document.page_count());

    // Type0 fonts with a CID descendant, a widths array and a ToUnicode map
    let type0_fonts = parsed
        .objects
        .values()
        .filter_map(|object| object.as_dict().ok())
        .filter(|dictionary| {
            dictionary.get(b"Subtype").and_then(|subtype| subtype.as_name()).ok()
                == Some(b"Type0".as_slice())
        })
        .collect::<Vec<_>>();
    assert_eq!(type0_fonts.len(), 3);
    let regular_face = TrueTypeFace::from_path(&font_candidate.regular_font_path).unwrap();
    let c_glyph_id = regular_face.glyph_id('C').unwrap();
    let mut maps_c_back = false;
    for type0_font in type0_fonts.iter() {
        assert_eq!(
            type0_font.get(b"Encoding").unwrap().as_name().unwrap(),
            b"Identity-H"
        );
        let descendant_font = type0_font.get(b"DescendantFonts").unwrap().as_array().unwrap()[0]
            .as_dict()
            .unwrap();
        assert_eq!(
            descendant_font.get(b"Subtype").unwrap().as_name().unwrap(),
            b"CIDFontType2"
        );
        let widths = descendant_font.get(b"W").unwrap().as_array().unwrap();
        assert_eq!(widths[0].as_i64().unwrap(), 0);
        assert!(!widths[1].as_array().unwrap().is_empty());

        let to_unicode_id = type0_font.get(b"ToUnicode").unwrap().as_reference().unwrap();
        let to_unicode = stream_text(&parsed, to_unicode_id);
        assert!(to_unicode.contains("beginbfchar"));
        maps_c_back |= to_unicode.contains(&format!("<{c_glyph_id:04X}> <0043>"));
    }
    assert!(maps_c_back);

    // The decomposed accent is written as a glyph of its own, nothing is dropped
    let expected_bytes = "Cafe\u{301}"
        .chars()
        .flat_map(|character| regular_face.glyph_id(character).unwrap().to_be_bytes())
        .collect::<Vec<u8>>();
    let first_page_id = *pages.values().next().unwrap();
    let content =
        lopdf::content::Content::decode(&parsed.get_page_content(first_page_id).unwrap()).unwrap();
    assert!(content.operations.iter().any(|operation| operation.operator == "Tj"
        && operation.operands.first().and_then(|operand| operand.as_str().ok())
            == Some(expected_bytes.as_slice())));

    // The italic face carries its own slant
    let italic_face = TrueTypeFace::from_path(&font_candidate.italic_font_path).unwrap();
    assert!(italic_face.italic_angle() != 0.0);
    let italic_angles = parsed
        .objects
        .values()
        .filter_map(|object| object.as_dict().ok())
        .filter(|dictionary| {
            dictionary.get(b"Type").and_then(|kind| kind.as_name()).ok()
                == Some(b"FontDescriptor".as_slice())
        })
        .map(|font_descriptor| font_descriptor.get(b"ItalicAngle").unwrap().as_float().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(italic_angles.len(), 3);
    assert!(italic_angles
        .iter()
        .any(|angle| (angle - italic_face.italic_angle()).abs() < 1e-3));
    assert_eq!(
        italic_angles.iter().filter(|angle| **angle == 0.0).count(),
        2
    );
}
