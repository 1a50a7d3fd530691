use std::{mem, path::Path};

use crate::{
    document::Operation,
    error::ContextError,
    fonts::{FontStyle, ResolvedFont},
};

/// Width of an A4 page in millimeters.
pub const PAGE_WIDTH: f32 = 210.0;
/// Height of an A4 page in millimeters.
pub const PAGE_HEIGHT: f32 = 297.0;
/// Left, top and right page margin.
pub const PAGE_MARGIN: f32 = 10.0;
/// Distance from the bottom edge below which no line is placed.
pub const AUTO_PAGE_BREAK_MARGIN: f32 = 15.0;
/// Horizontal padding between a cell border and its text.
pub const CELL_MARGIN: f32 = 1.0;
/// Width of the text area between the left and the right margin.
pub const BODY_WIDTH: f32 = PAGE_WIDTH - 2.0 * PAGE_MARGIN;

const FOOTER_OFFSET: f32 = 15.0;
const FOOTER_HEIGHT: f32 = 10.0;
const LINE_WIDTH: f32 = 0.2;
const MILLIMETERS_PER_POINT: f32 = 25.4 / 72.0;

/// An RGB color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// The channels scaled to the `0.0..=1.0` range PDF color operators expect.
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [self.red, self.green, self.blue].map(|channel| channel as f32 / 255.0)
    }
}

/// Everything that decides how a piece of text looks. It is handed to each call of the
/// canvas, which keeps no "current font" or "current color" of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_style: FontStyle,
    /// Size in points.
    pub font_size: f32,
    pub color: Color,
}

impl TextStyle {
    pub const fn new(font_style: FontStyle, font_size: f32, color: Color) -> Self {
        TextStyle {
            font_style,
            font_size,
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
}

/// A flow of A4 pages which text is placed onto line by line, top to bottom.
///
/// The canvas keeps a cursor (in millimeters from the top-left corner of the page) and turns
/// every placed element into an `Operation`. A new page is started as soon as a line would
/// cross the bottom threshold, and every page gets a centered page number in its footer.
pub struct Canvas<'a> {
    font: &'a ResolvedFont,
    operations: Vec<Operation>,
    page_count: usize,
    x: f32,
    y: f32,
}

impl<'a> Canvas<'a> {
    /// Creates a canvas measuring text with the given font, with its first page already added.
    pub fn new(font: &'a ResolvedFont) -> Self {
        let mut canvas = Canvas {
            font,
            operations: Vec::new(),
            page_count: 0,
            x: PAGE_MARGIN,
            y: PAGE_MARGIN,
        };
        canvas.add_page();
        canvas
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Closes the current page (drawing its footer) and starts a new one.
    pub fn add_page(&mut self) {
        if self.page_count > 0 {
            self.draw_footer();
        }
        self.page_count += 1;
        self.operations.push(Operation::AppendNewPage {
            page_width: PAGE_WIDTH,
            page_height: PAGE_HEIGHT,
        });
        self.x = PAGE_MARGIN;
        self.y = PAGE_MARGIN;
    }

    /// Draws the footer of the last page and returns every operation placed so far.
    pub fn finish(mut self) -> Vec<Operation> {
        self.draw_footer();
        self.operations
    }

    /// Moves the cursor back to the left margin and down by the given height.
    pub fn line_break(&mut self, height: f32) {
        self.x = PAGE_MARGIN;
        self.y += height;
    }

    /// Places a single line of text in a cell of the given height, then moves to the
    /// beginning of the next line. A width of `None` extends the cell to the right margin.
    pub fn cell(
        &mut self,
        style: &TextStyle,
        width: Option<f32>,
        height: f32,
        text: &str,
        alignment: Alignment,
    ) {
        self.break_page_if_needed(height);
        self.place_cell(style, width, height, text, alignment);
        self.line_break(height);
    }

    /// Places text wrapped to the width of the cell, one line of the given height per wrapped
    /// line, breaking pages as needed. The cursor ends at the left margin below the last line.
    pub fn multi_cell(&mut self, style: &TextStyle, width: Option<f32>, height: f32, text: &str) {
        let left = self.x;
        let width = self.resolve_width(width);
        for line in self.wrap_text(style, width - 2.0 * CELL_MARGIN, text) {
            self.break_page_if_needed(height);
            self.x = left;
            self.place_cell(style, Some(width), height, &line, Alignment::Left);
            self.y += height;
        }
        self.x = PAGE_MARGIN;
    }

    /// Draws a horizontal line across the body width at the current height.
    pub fn horizontal_rule(&mut self, color: Color) {
        self.operations.push(Operation::DrawLine {
            color: color.to_unit_rgb(),
            line_width: LINE_WIDTH,
            start: [PAGE_MARGIN, self.y],
            end: [PAGE_WIDTH - PAGE_MARGIN, self.y],
        });
    }

    /// Places an image with its top-left corner at the given position, scaled to the given
    /// width while keeping its aspect ratio. The cursor doesn't move. Returns the height.
    pub fn image(
        &mut self,
        image_path: &Path,
        position: [f32; 2],
        width: f32,
    ) -> Result<f32, ContextError> {
        let (pixel_width, pixel_height) = image::image_dimensions(image_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the dimensions of the image {:?}", image_path),
                &error,
            )
        })?;
        if pixel_width == 0 || pixel_height == 0 {
            return Err(ContextError::with_context(format!(
                "The image {:?} is empty",
                image_path
            )));
        }

        let height = width * pixel_height as f32 / pixel_width as f32;
        self.operations.push(Operation::PlaceImage {
            image_path: image_path.to_path_buf(),
            position,
            size: [width, height],
        });

        Ok(height)
    }

    /// Splits the text into lines no wider than `maximum_width` millimeters. Explicit newlines
    /// always break, lines are otherwise broken between words, and a word wider than a whole
    /// line is broken between characters.
    pub fn wrap_text(&self, style: &TextStyle, maximum_width: f32, text: &str) -> Vec<String> {
        let fits = |candidate: &str| {
            self.font
                .text_width(style.font_style, style.font_size, candidate)
                <= maximum_width
        };

        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let paragraph = paragraph.trim_end_matches('\r');
            // The indentation of the first line is kept, continuation lines start at the margin
            let words = paragraph.trim_start_matches(' ');
            let mut current_line = paragraph[..paragraph.len() - words.len()].to_string();
            let mut line_has_words = false;
            for word in words.split(' ') {
                let candidate = if line_has_words {
                    format!("{current_line} {word}")
                } else {
                    format!("{current_line}{word}")
                };
                if fits(&candidate) {
                    current_line = candidate;
                    line_has_words = true;
                    continue;
                }

                if line_has_words {
                    lines.push(mem::take(&mut current_line));
                }
                line_has_words = true;
                if fits(word) {
                    current_line = word.to_string();
                    continue;
                }
                for character in word.chars() {
                    current_line.push(character);
                    if !fits(&current_line) && current_line.chars().count() > 1 {
                        current_line.pop();
                        lines.push(mem::replace(&mut current_line, character.to_string()));
                    }
                }
            }
            lines.push(current_line);
        }

        lines
    }

    fn resolve_width(&self, width: Option<f32>) -> f32 {
        width.unwrap_or(PAGE_WIDTH - PAGE_MARGIN - self.x)
    }

    fn break_page_if_needed(&mut self, height: f32) {
        if self.y + height > PAGE_HEIGHT - AUTO_PAGE_BREAK_MARGIN {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
    }

    /// Emits the text of a cell at the cursor without moving it.
    fn place_cell(
        &mut self,
        style: &TextStyle,
        width: Option<f32>,
        height: f32,
        text: &str,
        alignment: Alignment,
    ) {
        if text.is_empty() {
            return;
        }

        let width = self.resolve_width(width);
        let offset = match alignment {
            Alignment::Left => CELL_MARGIN,
            Alignment::Center => {
                (width - self.font.text_width(style.font_style, style.font_size, text)) / 2.0
            }
        };
        // The baseline sits a little below the vertical center of the cell
        let baseline = self.y + 0.5 * height + 0.3 * style.font_size * MILLIMETERS_PER_POINT;

        self.operations.push(Operation::UnicodeText {
            color: style.color.to_unit_rgb(),
            position: [self.x + offset, baseline],
            text_string: text.to_string(),
            font_size: style.font_size,
            font_style: style.font_style,
        });
    }

    fn draw_footer(&mut self) {
        let style = TextStyle::new(FontStyle::Italic, 8.0, Color::BLACK);
        let label = format!("Page {}", self.page_count);
        self.x = PAGE_MARGIN;
        self.y = PAGE_HEIGHT - FOOTER_OFFSET;
        self.place_cell(&style, None, FOOTER_HEIGHT, &label, Alignment::Center);
    }
}
