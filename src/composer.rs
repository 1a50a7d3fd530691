use std::path::PathBuf;

use time::OffsetDateTime;

use crate::{
    configuration::ComposerConfiguration,
    content::{ContentDirectory, Fragment},
    document::Document,
    error::ContextError,
    fonts::{resolve_font, FontStyle, ResolvedFont},
    layout::{Alignment, Canvas, Color, TextStyle, BODY_WIDTH},
    output::{current_timestamp, format_timestamp, prepare_output_path, FALLBACK_ROLE},
};

pub const ACCENT: Color = Color::rgb(0, 51, 102);
const ROLE_GRAY: Color = Color::rgb(100, 100, 100);
const RULE_GRAY: Color = Color::rgb(200, 200, 200);

const NAME_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 24.0, ACCENT);
const ROLE_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 12.0, ROLE_GRAY);
const HEADLINE_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 12.0, ACCENT);
const TOP_SKILLS_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 10.0, Color::BLACK);
const CONTACT_STYLE: TextStyle = TextStyle::new(FontStyle::Regular, 9.0, Color::BLACK);
const SECTION_HEADER_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 12.0, ACCENT);
const BODY_STYLE: TextStyle = TextStyle::new(FontStyle::Regular, 10.0, Color::BLACK);
const EXPERIENCE_TITLE_STYLE: TextStyle = TextStyle::new(FontStyle::Bold, 10.0, Color::BLACK);
/// Small enough and white, so the keywords are read by parsers but not by people.
const ATS_STYLE: TextStyle = TextStyle::new(FontStyle::Regular, 1.0, Color::WHITE);

/// Top-left corner of the photo, in millimeters.
const PHOTO_POSITION: [f32; 2] = [160.0, 10.0];
const PHOTO_WIDTH: f32 = 35.0;
/// Width left to the header text when a photo occupies the top-right corner.
const HEADER_WIDTH_WITH_PHOTO: f32 = 140.0;

/// A titled block of the resume and the fragment it is filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub file_name: &'static str,
}

impl Section {
    const fn new(title: &'static str, file_name: &'static str) -> Self {
        Section { title, file_name }
    }
}

pub const LEAD_SECTIONS: [Section; 3] = [
    Section::new("Summary", "summary.txt"),
    Section::new("Career Highlights", "career_highlights.txt"),
    Section::new("Core Skills", "core_skills.txt"),
];

pub const PROFESSIONAL_EXPERIENCE_TITLE: &str = "Professional Experience";

pub const EXPERIENCE_FILE_NAMES: [&str; 4] = [
    "experience_1.txt",
    "experience_2.txt",
    "experience_3.txt",
    "experience_4.txt",
];

pub const TRAILING_SECTIONS: [Section; 4] = [
    Section::new("Selected Projects & Impact", "projects.txt"),
    Section::new("Certifications & Recognition", "certifications.txt"),
    Section::new("Education", "education.txt"),
    Section::new("Role Alignment", "role_alignment.txt"),
];

pub const ATS_FILE_NAME: &str = "ats.txt";

/// Every fragment of the resume, read once. Empty fragments are kept so that the composer
/// decides what to leave out.
#[derive(Debug, Clone)]
pub struct ResumeContent {
    pub name: Fragment,
    pub role: Fragment,
    pub headline: Fragment,
    pub top_skills: Fragment,
    pub contact: Fragment,
    pub photo: Option<PathBuf>,
    pub lead_sections: Vec<(Section, Fragment)>,
    pub experience_entries: Vec<Fragment>,
    pub trailing_sections: Vec<(Section, Fragment)>,
    pub ats_keywords: Fragment,
}

impl ResumeContent {
    pub fn load(content_directory: &ContentDirectory) -> Result<Self, ContextError> {
        let read_sections = |sections: &[Section]| {
            sections
                .iter()
                .map(|section| Ok((*section, content_directory.read_fragment(section.file_name)?)))
                .collect::<Result<Vec<_>, ContextError>>()
        };

        let resume_content = ResumeContent {
            name: content_directory.read_fragment("header.txt")?,
            role: content_directory.read_fragment("role.txt")?,
            headline: content_directory.read_fragment("headline.txt")?,
            top_skills: content_directory.read_fragment("top_skills.txt")?,
            contact: content_directory.read_fragment("contact.txt")?,
            photo: content_directory.find_photo()?,
            lead_sections: read_sections(&LEAD_SECTIONS)?,
            experience_entries: EXPERIENCE_FILE_NAMES
                .iter()
                .map(|file_name| content_directory.read_fragment(file_name))
                .collect::<Result<Vec<_>, ContextError>>()?,
            trailing_sections: read_sections(&TRAILING_SECTIONS)?,
            ats_keywords: content_directory.read_fragment(ATS_FILE_NAME)?,
        };

        log::debug!("Top skills: {:?}", resume_content.top_skills.as_str());
        log::debug!("Photo: {:?}", resume_content.photo);

        Ok(resume_content)
    }

    /// The width the header lines wrap within, narrower when the photo takes its corner.
    pub fn header_text_width(&self) -> f32 {
        if self.photo.is_some() {
            HEADER_WIDTH_WITH_PHOTO
        } else {
            BODY_WIDTH
        }
    }
}

/// Splits an experience entry into its first line (title and company) and the remaining
/// lines, if there are any.
pub fn split_experience_entry(entry: &str) -> (&str, Option<&str>) {
    match entry.split_once('\n') {
        Some((title, details)) => (title, Some(details)),
        None => (entry, None),
    }
}

/// Lays out the whole resume with the given font: header, sections, experience and the
/// hidden keywords, in this order.
pub fn compose_resume(
    resume_content: &ResumeContent,
    font: &ResolvedFont,
) -> Result<Document, ContextError> {
    let mut canvas = Canvas::new(font);

    log::info!("Composing the header");
    compose_header(&mut canvas, resume_content)?;

    for (section, fragment) in resume_content.lead_sections.iter() {
        compose_section(&mut canvas, section.title, fragment);
    }

    log::info!("Composing the professional experience");
    compose_section_header(&mut canvas, PROFESSIONAL_EXPERIENCE_TITLE);
    for (entry_index, entry) in resume_content.experience_entries.iter().enumerate() {
        if entry.is_empty() {
            continue;
        }
        log::debug!("Composing the experience entry {}", entry_index + 1);
        let (title, details) = split_experience_entry(entry.as_str());
        canvas.multi_cell(&EXPERIENCE_TITLE_STYLE, None, 5.0, title);
        if let Some(details) = details {
            canvas.multi_cell(&BODY_STYLE, None, 5.0, details);
        }
        canvas.line_break(3.0);
    }
    canvas.line_break(2.0);

    for (section, fragment) in resume_content.trailing_sections.iter() {
        compose_section(&mut canvas, section.title, fragment);
    }

    if !resume_content.ats_keywords.is_empty() {
        log::info!("Composing the ATS keywords");
        canvas.multi_cell(&ATS_STYLE, None, 1.0, resume_content.ats_keywords.as_str());
    }

    let page_count = canvas.page_count();
    let operations = canvas.finish();
    log::info!("The resume spans {} page(s)", page_count);

    let title = if resume_content.name.is_empty() {
        FALLBACK_ROLE.to_string()
    } else {
        resume_content.name.as_str().to_string()
    };

    Ok(Document {
        document_id: String::new(),
        instance_id: String::new(),
        title,
        author: resume_content.name.as_str().to_string(),
        font_family: font.family.clone(),
        operations,
    })
}

fn compose_header(canvas: &mut Canvas, resume_content: &ResumeContent) -> Result<(), ContextError> {
    if let Some(photo_path) = &resume_content.photo {
        canvas.image(photo_path, PHOTO_POSITION, PHOTO_WIDTH)?;
    }
    let header_width = Some(resume_content.header_text_width());

    canvas.multi_cell(&NAME_STYLE, header_width, 10.0, resume_content.name.as_str());
    canvas.multi_cell(&ROLE_STYLE, header_width, 10.0, resume_content.role.as_str());
    if !resume_content.headline.is_empty() {
        canvas.multi_cell(
            &HEADLINE_STYLE,
            header_width,
            8.0,
            resume_content.headline.as_str(),
        );
    }
    canvas.multi_cell(
        &TOP_SKILLS_STYLE,
        header_width,
        5.0,
        resume_content.top_skills.as_str(),
    );
    canvas.line_break(2.0);

    for contact_line in resume_content.contact.as_str().split('\n') {
        let contact_line = contact_line.trim();
        if !contact_line.is_empty() {
            canvas.multi_cell(&CONTACT_STYLE, header_width, 5.0, contact_line);
        }
    }
    canvas.line_break(5.0);

    canvas.horizontal_rule(RULE_GRAY);
    canvas.line_break(5.0);

    Ok(())
}

fn compose_section_header(canvas: &mut Canvas, title: &str) {
    canvas.cell(
        &SECTION_HEADER_STYLE,
        None,
        8.0,
        &title.to_uppercase(),
        Alignment::Left,
    );
    canvas.line_break(1.0);
}

/// An empty fragment leaves the whole section out, heading included.
fn compose_section(canvas: &mut Canvas, title: &str, fragment: &Fragment) {
    if fragment.is_empty() {
        log::debug!("Skipping the empty section {:?}", title);
        return;
    }
    log::info!("Composing the section {:?}", title);

    compose_section_header(canvas, title);
    canvas.multi_cell(&BODY_STYLE, None, 5.0, fragment.as_str());
    canvas.line_break(3.0);
    canvas.line_break(2.0);
}

/// The outcome of a run: where the resume was written and how it was laid out.
#[derive(Debug, Clone)]
pub struct GeneratedResume {
    pub output_path: PathBuf,
    pub document: Document,
}

/// Reads the content directory, lays out the resume and writes it to a new file of the
/// output directory, named after the person, the role and the current time.
pub fn generate_resume(
    configuration: &ComposerConfiguration,
) -> Result<GeneratedResume, ContextError> {
    generate_resume_at(configuration, current_timestamp())
}

/// Like `generate_resume`, with the generation time given.
pub fn generate_resume_at(
    configuration: &ComposerConfiguration,
    timestamp: OffsetDateTime,
) -> Result<GeneratedResume, ContextError> {
    let content_directory = ContentDirectory::new(
        &configuration.content_directory,
        &configuration.photo_subdirectory,
    );
    log::info!("Reading the content from {:?}", content_directory.root());
    let resume_content = ResumeContent::load(&content_directory)?;

    let font = resolve_font(&configuration.font_candidates);
    let document = compose_resume(&resume_content, &font)?;

    let output_path = prepare_output_path(
        &configuration.output_directory,
        resume_content.name.as_str(),
        resume_content.role.as_str(),
        timestamp,
    )?;
    let document_id = output_path
        .file_stem()
        .map(|file_stem| file_stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let document = document.with_identifiers(document_id, format_timestamp(timestamp)?);

    log::info!("Writing the resume to {:?}", output_path);
    document.save_to_pdf_file(&font, &output_path, timestamp)?;

    Ok(GeneratedResume {
        output_path,
        document,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        compose_resume, split_experience_entry, ResumeContent, ACCENT, HEADER_WIDTH_WITH_PHOTO,
    };
    use crate::{
        content::ContentDirectory,
        document::{Document, Operation},
        fonts::{FontStyle, ResolvedFont},
        layout::{Color, BODY_WIDTH, PAGE_MARGIN},
    };

    #[derive(Debug, Clone, PartialEq)]
    struct PlacedText {
        text: String,
        x: f32,
        font_style: FontStyle,
        font_size: f32,
        color: [f32; 3],
    }

    fn placed_texts(document: &Document) -> Vec<PlacedText> {
        document
            .operations
            .iter()
            .filter_map(|operation| match operation {
                Operation::UnicodeText {
                    color,
                    position: [x, _],
                    text_string,
                    font_size,
                    font_style,
                } => Some(PlacedText {
                    text: text_string.clone(),
                    x: *x,
                    font_style: *font_style,
                    font_size: *font_size,
                    color: *color,
                }),
                _ => None,
            })
            .collect()
    }

    fn compose(content_root: &Path) -> Document {
        let resume_content =
            ResumeContent::load(&ContentDirectory::new(content_root, "photo")).unwrap();
        compose_resume(&resume_content, &ResolvedFont::standard()).unwrap()
    }

    fn write_fragments(content_root: &Path, fragments: &[(&str, &str)]) {
        for (file_name, text) in fragments {
            std::fs::write(content_root.join(file_name), text).unwrap();
        }
    }

    #[test]
    fn experience_entry_is_split_after_the_first_line() {
        assert_eq!(
            split_experience_entry("Senior Engineer @ Acme\nDid X\nDid Y"),
            ("Senior Engineer @ Acme", Some("Did X\nDid Y"))
        );
        assert_eq!(
            split_experience_entry("Senior Engineer @ Acme"),
            ("Senior Engineer @ Acme", None)
        );
    }

    #[test]
    fn experience_title_is_bold_and_details_are_regular() {
        let directory = tempfile::tempdir().unwrap();
        write_fragments(
            directory.path(),
            &[
                ("header.txt", "Jane Doe"),
                ("experience_2.txt", "Senior Engineer @ Acme\nDid X\nDid Y"),
            ],
        );

        let texts = placed_texts(&compose(directory.path()));

        let title_index = texts
            .iter()
            .position(|placed| placed.text == "Senior Engineer @ Acme")
            .unwrap();
        assert_eq!(texts[title_index].font_style, FontStyle::Bold);
        assert_eq!(texts[title_index + 1].text, "Did X");
        assert_eq!(texts[title_index + 1].font_style, FontStyle::Regular);
        assert_eq!(texts[title_index + 2].text, "Did Y");
        assert_eq!(texts[title_index + 2].font_style, FontStyle::Regular);
    }

    #[test]
    fn missing_sections_are_left_out_but_experience_heading_stays() {
        let directory = tempfile::tempdir().unwrap();
        write_fragments(
            directory.path(),
            &[
                ("header.txt", "Jane Doe"),
                ("summary.txt", "Builds reliable systems."),
                ("education.txt", "   \n  "),
            ],
        );

        let headings = placed_texts(&compose(directory.path()))
            .into_iter()
            .filter(|placed| placed.font_size == 12.0 && placed.color == ACCENT.to_unit_rgb())
            .map(|placed| placed.text)
            .collect::<Vec<_>>();

        assert_eq!(headings, vec!["SUMMARY", "PROFESSIONAL EXPERIENCE"]);
    }

    #[test]
    fn sections_follow_the_fixed_order() {
        let directory = tempfile::tempdir().unwrap();
        write_fragments(
            directory.path(),
            &[
                ("role_alignment.txt", "Platform roles."),
                ("experience_1.txt", "Engineer @ Initech"),
                ("core_skills.txt", "Rust"),
                ("projects.txt", "A compiler."),
                ("summary.txt", "Engineer."),
            ],
        );

        let headings = placed_texts(&compose(directory.path()))
            .into_iter()
            .filter(|placed| placed.font_size == 12.0 && placed.color == ACCENT.to_unit_rgb())
            .map(|placed| placed.text)
            .collect::<Vec<_>>();

        assert_eq!(
            headings,
            vec![
                "SUMMARY",
                "CORE SKILLS",
                "PROFESSIONAL EXPERIENCE",
                "SELECTED PROJECTS & IMPACT",
                "ROLE ALIGNMENT"
            ]
        );
    }

    #[test]
    fn ats_keywords_are_tiny_white_and_last() {
        let directory = tempfile::tempdir().unwrap();
        write_fragments(
            directory.path(),
            &[
                ("header.txt", "Jane Doe"),
                ("education.txt", "BSc Computer Science"),
                ("ats.txt", "Kubernetes Terraform Rust"),
            ],
        );

        let texts = placed_texts(&compose(directory.path()));
        // The footer of the only page follows everything else
        let footer = texts.last().unwrap();
        let keywords = &texts[texts.len() - 2];

        assert_eq!(footer.text, "Page 1");
        assert_eq!(footer.color, Color::BLACK.to_unit_rgb());
        assert_eq!(keywords.text, "Kubernetes Terraform Rust");
        assert_eq!(keywords.font_size, 1.0);
        assert_eq!(keywords.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn header_uses_the_body_width_without_photo() {
        let directory = tempfile::tempdir().unwrap();
        let font = ResolvedFont::standard();
        let mut role = String::new();
        while font.text_width(FontStyle::Bold, 12.0, &role) < 160.0 {
            role.push_str("Platform ");
        }
        let role = role.trim_end().to_string();
        write_fragments(directory.path(), &[("header.txt", "Jane Doe"), ("role.txt", &role)]);

        let resume_content =
            ResumeContent::load(&ContentDirectory::new(directory.path(), "photo")).unwrap();
        assert_eq!(resume_content.header_text_width(), BODY_WIDTH);
        let texts = placed_texts(&compose_resume(&resume_content, &font).unwrap());
        assert!(texts.iter().any(|placed| placed.text == role));

        // With a photo the same role no longer fits on one line
        let photo_directory = directory.path().join("photo");
        std::fs::create_dir(&photo_directory).unwrap();
        image::RgbImage::from_pixel(30, 40, image::Rgb([200, 180, 160]))
            .save(photo_directory.join("portrait.png"))
            .unwrap();

        let resume_content =
            ResumeContent::load(&ContentDirectory::new(directory.path(), "photo")).unwrap();
        assert_eq!(resume_content.header_text_width(), HEADER_WIDTH_WITH_PHOTO);
        let document = compose_resume(&resume_content, &font).unwrap();
        let texts = placed_texts(&document);
        assert!(!texts.iter().any(|placed| placed.text == role));
        for placed in texts.iter().filter(|placed| placed.font_size == 12.0) {
            if role.starts_with(placed.text.as_str()) {
                let right_edge =
                    placed.x + font.text_width(placed.font_style, placed.font_size, &placed.text);
                assert!(right_edge <= PAGE_MARGIN + HEADER_WIDTH_WITH_PHOTO);
            }
        }
        assert!(matches!(
            &document.operations[1],
            Operation::PlaceImage { position, size, .. }
                if *position == [160.0, 10.0] && size[0] == 35.0 && (size[1] - 35.0 * 40.0 / 30.0).abs() < 1e-4
        ));
    }

    #[test]
    fn contact_lines_are_placed_one_by_one() {
        let directory = tempfile::tempdir().unwrap();
        write_fragments(
            directory.path(),
            &[("contact.txt", "jane@example.com\n\n   \n  +1 555 0100  ")],
        );

        let contact_lines = placed_texts(&compose(directory.path()))
            .into_iter()
            .filter(|placed| placed.font_size == 9.0)
            .map(|placed| placed.text)
            .collect::<Vec<_>>();

        assert_eq!(contact_lines, vec!["jane@example.com", "+1 555 0100"]);
    }
}
