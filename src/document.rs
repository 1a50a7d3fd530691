use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use time::OffsetDateTime;

use crate::{
    error::ContextError,
    fonts::{FontStyle, ResolvedFont},
    pdf::{DocumentInformation, PdfDocument},
};

/// A laid out document: everything needed to produce the PDF except the font data itself,
/// which is resolved on the host. It can be written as JSON to inspect a layout.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    pub instance_id: String,
    pub title: String,
    pub author: String,
    /// The family the layout was measured with, rendering with another one is refused.
    pub font_family: String,
    pub operations: Vec<Operation>,
}

/// A drawing operation. Positions and sizes are in millimeters, measured from the top-left
/// corner of the page; text positions are the left end of the baseline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    AppendNewPage { page_width: f32, page_height: f32 },
    #[serde(rename_all = "camelCase")]
    UnicodeText {
        color: [f32; 3],
        position: [f32; 2],
        text_string: String,
        font_size: f32,
        font_style: FontStyle,
    },
    #[serde(rename_all = "camelCase")]
    DrawLine {
        color: [f32; 3],
        line_width: f32,
        start: [f32; 2],
        end: [f32; 2],
    },
    #[serde(rename_all = "camelCase")]
    PlaceImage {
        image_path: PathBuf,
        position: [f32; 2],
        size: [f32; 2],
    },
}

impl Document {
    pub fn with_identifiers(self, document_id: String, instance_id: String) -> Self {
        Document {
            document_id,
            instance_id,
            ..self
        }
    }

    pub fn page_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|operation| matches!(operation, Operation::AppendNewPage { .. }))
            .count()
    }

    /// Converts the operations into a `PdfDocument`, registering the three styles of the
    /// resolved font and loading every referenced image once.
    pub fn to_pdf_document(
        &self,
        font: &ResolvedFont,
        creation_date: OffsetDateTime,
    ) -> Result<PdfDocument, ContextError> {
        if font.family != self.font_family {
            return Err(ContextError::with_context(format!(
                "The document was laid out with the font family {:?} but {:?} was given",
                self.font_family, font.family
            )));
        }

        let mut pdf_document = PdfDocument::new(self.document_id.clone());
        let mut font_indices = HashMap::new();
        for font_style in FontStyle::ALL {
            let font_index = match font.faces() {
                Some(faces) => pdf_document.add_true_type_font(faces.face(font_style)),
                None => pdf_document.add_standard_font(font_style.standard_base_font()),
            };
            font_indices.insert(font_style, font_index);
        }

        let mut image_indices: HashMap<&Path, usize> = HashMap::new();
        // The index and the height of the page being drawn onto
        let mut current_page: Option<(usize, f32)> = None;

        for operation in self.operations.iter() {
            match operation {
                Operation::AppendNewPage {
                    page_width,
                    page_height,
                } => {
                    let page_index = pdf_document.add_page(*page_width, *page_height);
                    current_page = Some((page_index, *page_height));
                }
                Operation::UnicodeText {
                    color,
                    position: [x, y],
                    text_string,
                    font_size,
                    font_style,
                } => {
                    let (page_index, page_height) = drawn_page(current_page)?;
                    let font_index =
                        *font_indices
                            .get(font_style)
                            .ok_or(ContextError::with_context(format!(
                                "The font style {:?} was not registered",
                                font_style
                            )))?;
                    pdf_document.write_text_to_page(
                        page_index,
                        *color,
                        text_string,
                        font_index,
                        *font_size,
                        [*x, page_height - y],
                    )?;
                }
                Operation::DrawLine {
                    color,
                    line_width,
                    start: [start_x, start_y],
                    end: [end_x, end_y],
                } => {
                    let (page_index, page_height) = drawn_page(current_page)?;
                    pdf_document.draw_line_to_page(
                        page_index,
                        *color,
                        *line_width,
                        [*start_x, page_height - start_y],
                        [*end_x, page_height - end_y],
                    )?;
                }
                Operation::PlaceImage {
                    image_path,
                    position: [x, y],
                    size: [width, height],
                } => {
                    let (page_index, page_height) = drawn_page(current_page)?;
                    let image_index = match image_indices.get(image_path.as_path()) {
                        Some(image_index) => *image_index,
                        None => {
                            let image_index = pdf_document.add_image(image_path)?;
                            image_indices.insert(image_path.as_path(), image_index);
                            image_index
                        }
                    };
                    pdf_document.place_image_to_page(
                        page_index,
                        image_index,
                        [*x, page_height - y - height],
                        [*width, *height],
                    )?;
                }
            }
        }

        pdf_document.write_all(
            self.instance_id.clone(),
            &DocumentInformation {
                title: self.title.clone(),
                author: self.author.clone(),
                creation_date,
            },
        )?;

        Ok(pdf_document)
    }

    /// Renders the document and writes it to a new file, an existing file is never overwritten.
    pub fn save_to_pdf_file(
        &self,
        font: &ResolvedFont,
        pdf_file_path: &Path,
        creation_date: OffsetDateTime,
    ) -> Result<(), ContextError> {
        let mut pdf_document = self.to_pdf_document(font, creation_date)?;
        pdf_document.optimize();
        pdf_document.save_to_file(pdf_file_path)
    }
}

fn drawn_page(current_page: Option<(usize, f32)>) -> Result<(usize, f32), ContextError> {
    current_page.ok_or(ContextError::with_context(
        "A drawing operation precedes the first page of the document",
    ))
}
