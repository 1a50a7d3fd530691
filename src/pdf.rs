use lopdf::{content::Operation, Object, StringFormat};
use std::{
    collections::BTreeMap,
    io::{BufWriter, Write as _},
    mem,
    path::Path,
};
use time::OffsetDateTime;

use crate::{error::ContextError, fonts::TrueTypeFace};

/// How the glyphs of a font reach the PDF document.
#[derive(Debug, Clone)]
enum FontProgram {
    /// A TrueType font embedded as a CID font, text is written as glyph IDs.
    TrueType(TrueTypeFace),
    /// One of the standard Type1 fonts every PDF reader ships, text is written as ASCII.
    Standard { base_font: String },
}

/// A font registered into the document, together with the identifier it is selected by.
#[derive(Debug, Clone)]
struct Font {
    program: FontProgram,
    face_identifier: String,
}

impl Font {
    /// Encodes the text into the bytes of a `Tj` string operand. Characters the font has
    /// no glyph for are dropped, and the event is logged.
    fn encode_text(&self, text: &str) -> Vec<u8> {
        let mut missing_characters = Vec::new();
        let bytes = match &self.program {
            FontProgram::TrueType(face) => text
                .chars()
                .filter_map(|character| {
                    let glyph_id = face.glyph_id(character);
                    if glyph_id.is_none() {
                        missing_characters.push(character);
                    }
                    glyph_id
                })
                .flat_map(|glyph_id| glyph_id.to_be_bytes())
                .collect(),
            FontProgram::Standard { .. } => text
                .chars()
                .filter_map(|character| {
                    if matches!(character, ' '..='~') {
                        Some(character as u8)
                    } else {
                        missing_characters.push(character);
                        None
                    }
                })
                .collect(),
        };

        if !missing_characters.is_empty() {
            log::warn!(
                "Unable to find the characters {:?} in the font {:?}, they are left out",
                missing_characters,
                self.face_identifier
            );
        }

        bytes
    }

    /// Inserts whatever the font needs into the PDF document, returning the font dictionary.
    fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        use lopdf::Object::*;

        match &self.program {
            FontProgram::Standard { base_font } => lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Font".into())),
                ("Subtype", Name("Type1".into())),
                ("BaseFont", Name(base_font.clone().into_bytes())),
                ("Encoding", Name("WinAnsiEncoding".into())),
            ]),
            FontProgram::TrueType(face) => {
                insert_true_type_font(face, &self.face_identifier, inner_document)
            }
        }
    }
}

/// Embeds the whole TrueType font as a `Type0` font with a single `CIDFontType2` descendant,
/// `Identity-H` encoding (two bytes per glyph ID) and a `ToUnicode` map so that the text can
/// be searched and extracted.
fn insert_true_type_font(
    face: &TrueTypeFace,
    face_identifier: &str,
    inner_document: &mut lopdf::Document,
) -> lopdf::Dictionary {
    use lopdf::Object::*;

    // Every metric is expressed in a 1000 units em square
    let scaling = 1000.0 / face.units_per_em() as f32;
    let scaled = |value: i16| Integer((value as f32 * scaling) as i64);
    let face_metrics = face.font_metrics();

    let font_stream = lopdf::Stream::new(
        lopdf::Dictionary::from_iter(vec![("Length1", Integer(face.bytes().len() as i64))]),
        face.bytes().to_vec(),
    );
    let font_stream_id = inner_document.add_object(font_stream);

    let [x_min, y_min, x_max, y_max] = face.bounding_box();
    let italic_angle = face.italic_angle();
    // Nonsymbolic (the standard Latin character set), and italic for slanted faces
    let flags = if italic_angle != 0.0 { 32 | 64 } else { 32 };
    let font_descriptor = lopdf::Dictionary::from_iter(vec![
        ("Type", Name("FontDescriptor".into())),
        ("FontName", Name(face_identifier.into())),
        ("Ascent", scaled(face_metrics.ascent)),
        ("Descent", scaled(face_metrics.descent)),
        ("CapHeight", scaled(face_metrics.ascent)),
        ("ItalicAngle", Real(italic_angle)),
        ("Flags", Integer(flags)),
        ("StemV", Integer(80)),
        (
            "FontBBox",
            Array(vec![
                scaled(x_min),
                scaled(y_min),
                scaled(x_max),
                scaled(y_max),
            ]),
        ),
        ("FontFile2", Reference(font_stream_id)),
    ]);
    let font_descriptor_id = inner_document.add_object(font_descriptor);

    // A single run starting at glyph 0: `0 [w0 w1 w2 ...]`
    let glyph_widths = (0..face.glyph_count())
        .map(|glyph_id| match face.glyph_advance(glyph_id) {
            Some(advance) => Integer((advance as f32 * scaling) as i64),
            None => {
                log::trace!(
                    "Glyph ID {} of the font {:?} has no width",
                    glyph_id,
                    face_identifier
                );
                Integer(0)
            }
        })
        .collect::<Vec<_>>();

    let descendant_font = lopdf::Dictionary::from_iter(vec![
        ("Type", Name("Font".into())),
        ("Subtype", Name("CIDFontType2".into())),
        ("BaseFont", Name(face_identifier.into())),
        (
            "CIDSystemInfo",
            Dictionary(lopdf::Dictionary::from_iter(vec![
                ("Registry", String("Adobe".into(), StringFormat::Literal)),
                ("Ordering", String("Identity".into(), StringFormat::Literal)),
                ("Supplement", Integer(0)),
            ])),
        ),
        ("W", Array(vec![Integer(0), Array(glyph_widths)])),
        ("DW", Integer(1000)),
        ("CIDToGIDMap", Name("Identity".into())),
        ("FontDescriptor", Reference(font_descriptor_id)),
    ]);

    let glyph_characters: BTreeMap<u16, char> = face.glyph_ids().into_iter().collect();
    let cid_to_unicode_map = generate_cid_to_unicode_map(face_identifier, &glyph_characters);
    let cid_to_unicode_map_id = inner_document.add_object(lopdf::Stream::new(
        lopdf::Dictionary::new(),
        cid_to_unicode_map.into_bytes(),
    ));

    lopdf::Dictionary::from_iter(vec![
        ("Type", Name("Font".into())),
        ("Subtype", Name("Type0".into())),
        ("BaseFont", Name(face_identifier.into())),
        // `Identity-H` is used for horizontal writing, while `Identity-V` for vertical writing
        ("Encoding", Name("Identity-H".into())),
        ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
        ("ToUnicode", Reference(cid_to_unicode_map_id)),
    ])
}

/// The low-level image representation for a PDF document: 8 bit RGB samples.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// Should the image be interpolated when scaled?
    pub interpolate: bool,
    /// The RGB samples, row by row.
    pub image_data: Vec<u8>,
}

impl ImageXObject {
    /// Decodes a PNG or JPEG file, dropping the alpha channel if there is one.
    pub fn from_path(image_path: &Path) -> Result<Self, ContextError> {
        let image = image::open(image_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!("Unable to decode the image {:?}", image_path),
                    &error,
                )
            })?
            .to_rgb8();

        Ok(ImageXObject {
            width: image.width(),
            height: image.height(),
            interpolate: true,
            image_data: image.into_raw(),
        })
    }
}

impl From<ImageXObject> for lopdf::Stream {
    fn from(value: ImageXObject) -> Self {
        use lopdf::Object::*;

        lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![
                ("Type", Name("XObject".into())),
                ("Subtype", Name("Image".into())),
                ("Width", Integer(value.width as i64)),
                ("Height", Integer(value.height as i64)),
                ("ColorSpace", Name("DeviceRGB".into())),
                ("BitsPerComponent", Integer(8)),
                ("Interpolate", Boolean(value.interpolate)),
            ]),
            value.image_data,
        )
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }
}

/// The representation of a PDF page: its size and the content stream operations drawn onto it.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    pub(crate) operations: Vec<Operation>,
}

/// The metadata written into the document information dictionary.
#[derive(Debug, Clone)]
pub struct DocumentInformation {
    pub title: String,
    pub author: String,
    pub creation_date: OffsetDateTime,
}

/// Converts millimeters to points, the unit `lopdf` (and the PDF format) works in.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// underlying `lopdf::Document` with the addition of the pages, fonts and images used in it.
///
/// Positions handed to it are in millimeters from the bottom-left corner of the page, as in
/// the PDF coordinate system, and fonts and images are referred to by the index returned when
/// registering them.
pub struct PdfDocument {
    /// The association between the fonts ID, the object it is represented by and its data.
    fonts: BTreeMap<String, (lopdf::ObjectId, Font)>,
    images: Vec<ImageXObject>,
    /// The underlying PDF document, exposed for low-level adjustments.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used in order to set the PDF `ID` tag.
    pub identifier: String,
    pub(crate) pages: Vec<PdfPage>,
}

impl PdfDocument {
    /// Create a new `PdfDocument` targeting version 1.5 of the PDF specification.
    pub fn new(pdf_document_identifier: String) -> Self {
        PdfDocument {
            fonts: BTreeMap::default(),
            images: Vec::new(),
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
        }
    }

    /// Adds a page of given width and height in millimeters, returning its index.
    pub fn add_page(&mut self, page_width: f32, page_height: f32) -> usize {
        self.pages.push(PdfPage {
            width: millimeters_to_points(page_width),
            height: millimeters_to_points(page_height),
            operations: Vec::new(),
        });

        self.pages.len() - 1
    }

    /// Registers a TrueType face, which is embedded in full when the document is written.
    pub fn add_true_type_font(&mut self, face: &TrueTypeFace) -> usize {
        self.add_font(FontProgram::TrueType(face.clone()))
    }

    /// Registers one of the standard Type1 fonts (for example `Helvetica-Bold`).
    pub fn add_standard_font(&mut self, base_font: &str) -> usize {
        self.add_font(FontProgram::Standard {
            base_font: base_font.to_string(),
        })
    }

    fn add_font(&mut self, program: FontProgram) -> usize {
        let font_index = self.fonts.len();
        let font = Font {
            program,
            face_identifier: format!("F{font_index}"),
        };
        // The object ID is reserved now and filled in by `write_all`
        let font_object_id = self.inner_document.new_object_id();
        self.fonts
            .insert(font.face_identifier.clone(), (font_object_id, font));

        font_index
    }

    /// Decodes an image file and registers it, returning the index to draw it with.
    pub fn add_image(&mut self, image_path: &Path) -> Result<usize, ContextError> {
        let image = ImageXObject::from_path(image_path)?;
        self.images.push(image);

        Ok(self.images.len() - 1)
    }

    /// Writes the text in the specified font and color with its baseline starting at the
    /// given position, in millimeters.
    pub fn write_text_to_page(
        &mut self,
        page_index: usize,
        color: [f32; 3],
        text: &str,
        font_index: usize,
        font_size: f32,
        baseline_position: [f32; 2],
    ) -> Result<(), ContextError> {
        let font = self.get_font(font_index)?;
        let text_bytes = font.encode_text(text);
        let face_identifier = font.face_identifier.clone();
        let [x, y] = baseline_position;

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(face_identifier.into_bytes()),
                        Object::Real(font_size),
                    ],
                ),
                Operation::new(
                    "Td",
                    vec![
                        Object::Real(millimeters_to_points(x)),
                        Object::Real(millimeters_to_points(y)),
                    ],
                ),
                Operation::new("rg", color.into_iter().map(Object::Real).collect()),
                Operation::new(
                    "Tj",
                    vec![Object::String(text_bytes, StringFormat::Hexadecimal)],
                ),
                Operation::new("ET", vec![]),
            ],
        )
    }

    /// Strokes a straight line between two points given in millimeters.
    pub fn draw_line_to_page(
        &mut self,
        page_index: usize,
        color: [f32; 3],
        line_width: f32,
        start: [f32; 2],
        end: [f32; 2],
    ) -> Result<(), ContextError> {
        let point = |[x, y]: [f32; 2]| {
            vec![
                Object::Real(millimeters_to_points(x)),
                Object::Real(millimeters_to_points(y)),
            ]
        };

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new("RG", color.into_iter().map(Object::Real).collect()),
                Operation::new("w", vec![Object::Real(millimeters_to_points(line_width))]),
                Operation::new("m", point(start)),
                Operation::new("l", point(end)),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Draws a registered image with its bottom-left corner at the given position, stretched
    /// to the given size, both in millimeters.
    pub fn place_image_to_page(
        &mut self,
        page_index: usize,
        image_index: usize,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), ContextError> {
        if image_index >= self.images.len() {
            return Err(ContextError::with_context(format!(
                "Failed to find the image with index {}",
                image_index
            )));
        }
        let [x, y] = position.map(millimeters_to_points);
        let [width, height] = size.map(millimeters_to_points);

        self.add_operations_to_page(
            page_index,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    [width, 0.0, 0.0, height, x, y]
                        .into_iter()
                        .map(Object::Real)
                        .collect(),
                ),
                Operation::new(
                    "Do",
                    vec![Object::Name(
                        XObjectReference::new(image_index).0.into_bytes(),
                    )],
                ),
                Operation::new("Q", vec![]),
            ],
        )
    }

    /// Write the pages, fonts and images so far registered into the underlying document and
    /// finalize it. The instance ID is the second entry of the trailer `ID` array.
    pub fn write_all(
        &mut self,
        instance_id: String,
        information: &DocumentInformation,
    ) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let creation_date = to_pdf_timestamp_format(&information.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", to_pdf_text_string(&information.title)),
            ("Author", to_pdf_text_string(&information.author)),
            ("Creator", to_pdf_text_string(env!("CARGO_PKG_NAME"))),
            (
                "Producer",
                to_pdf_text_string(&format!(
                    "{} {}",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                )),
            ),
            ("CreationDate", String(creation_date.clone().into_bytes(), Literal)),
            ("ModDate", String(creation_date.into_bytes(), Literal)),
            ("Trapped", Name("False".into())),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let pages_id = self.inner_document.new_object_id();
        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("PageMode", Name("UseNone".into())),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(instance_id.into_bytes(), Literal),
            ]),
        );

        let fonts_dictionary = self.insert_fonts_into_document();
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let xobjects_dictionary = self.insert_images_into_document();
        let xobjects_dictionary_id = if xobjects_dictionary.is_empty() {
            None
        } else {
            Some(self.inner_document.add_object(xobjects_dictionary))
        };

        let mut page_ids = Vec::<lopdf::Object>::new();
        for page in self.pages.iter_mut() {
            let mut resources = lopdf::Dictionary::from_iter(vec![(
                "Font",
                Reference(fonts_dictionary_id),
            )]);
            if let Some(xobjects_dictionary_id) = xobjects_dictionary_id {
                resources.set("XObject", Reference(xobjects_dictionary_id));
            }

            let page_content = lopdf::content::Content {
                operations: mem::take(&mut page.operations),
            }
            .encode()
            .map_err(|error| {
                ContextError::with_error("Failed to encode the content of a page", &error)
            })?;
            let page_content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), page_content));

            let media_box = Array(vec![
                Integer(0),
                Integer(0),
                Real(page.width),
                Real(page.height),
            ]);
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Parent", Reference(pages_id)),
                ("MediaBox", media_box.clone()),
                ("CropBox", media_box),
                ("Rotate", Integer(0)),
                ("Resources", Dictionary(resources)),
                ("Contents", Reference(page_content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        Ok(())
    }

    /// Optimize the PDF document (only superficially), compressing every stream.
    pub fn optimize(&mut self) {
        self.inner_document.prune_objects();
        self.inner_document.delete_zero_length_streams();
        self.inner_document.renumber_objects();
        self.inner_document.compress();
    }

    /// Save the `PdfDocument` to bytes in order for it to be written to a file or further processed.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }

    /// Saves the document to a file which must not exist yet.
    pub fn save_to_file(&mut self, pdf_file_path: &Path) -> Result<(), ContextError> {
        let pdf_document_bytes = self.save_to_bytes()?;
        let mut pdf_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(pdf_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!("Failed to create the output file {:?}", pdf_file_path),
                    &error,
                )
            })?;
        pdf_file.write_all(&pdf_document_bytes).map_err(|error| {
            ContextError::with_error(
                format!("Failed to save the output file {:?}", pdf_file_path),
                &error,
            )
        })
    }

    /// Converts the fonts into a dictionary and inserts them into the document.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (face_identifier, (font_object_id, font)) in self.fonts.iter() {
            let collected_font_dictionary = font.insert_into_document(&mut self.inner_document);

            self.inner_document.objects.insert(
                *font_object_id,
                lopdf::Object::Dictionary(collected_font_dictionary),
            );
            font_dictionary.set(
                face_identifier.clone(),
                lopdf::Object::Reference(*font_object_id),
            );
        }

        font_dictionary
    }

    /// Inserts the image streams into the document, returning the `XObject` dictionary naming them.
    fn insert_images_into_document(&mut self) -> lopdf::Dictionary {
        let mut xobjects_dictionary = lopdf::Dictionary::new();

        for (image_index, image) in mem::take(&mut self.images).into_iter().enumerate() {
            let image_stream: lopdf::Stream = image.into();
            let image_id = self.inner_document.add_object(image_stream);
            xobjects_dictionary.set(
                XObjectReference::new(image_index).0,
                lopdf::Object::Reference(image_id),
            );
        }

        xobjects_dictionary
    }

    fn add_operations_to_page(
        &mut self,
        page_index: usize,
        operations: Vec<Operation>,
    ) -> Result<(), ContextError> {
        let pdf_page = self
            .pages
            .get_mut(page_index)
            .ok_or(ContextError::with_context(format!(
                "Failed to find the page with index {}",
                page_index
            )))?;
        pdf_page.operations.extend(operations);

        Ok(())
    }

    fn get_font(&self, font_index: usize) -> Result<&Font, ContextError> {
        self.fonts
            .get(&format!("F{font_index}"))
            .map(|(_, font)| font)
            .ok_or(ContextError::with_context(format!(
                "Failed to find font {} into the fonts map",
                font_index
            )))
    }
}

/// Generates the `ToUnicode` CMap of a font: every glyph ID is mapped back to the UTF-16 code
/// units of its character, in `bfchar` blocks of at most 100 entries.
fn generate_cid_to_unicode_map(
    face_identifier: &str,
    glyph_characters: &BTreeMap<u16, char>,
) -> String {
    let mut cid_to_unicode_map = format!(
        include_str!("../assets/cid_to_unicode_header.txt"),
        face_identifier
    );

    let entries = glyph_characters.iter().collect::<Vec<_>>();
    for cmap_block in entries.chunks(100) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\n", cmap_block.len()));
        for (glyph_id, character) in cmap_block {
            let utf16 = character
                .encode_utf16(&mut [0; 2])
                .iter()
                .map(|code_unit| format!("{code_unit:04X}"))
                .collect::<std::string::String>();
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04X}> <{utf16}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/cid_to_unicode_footer.txt"));

    cid_to_unicode_map
}

/// Encodes a text string as UTF-16BE with a byte order mark, which PDF readers accept for
/// any text outside of PDFDocEncoding.
fn to_pdf_text_string(text: &str) -> Object {
    let bytes = [0xFE, 0xFF]
        .into_iter()
        .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
        .collect();

    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
