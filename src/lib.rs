//! resumr composes a PDF resume out of a directory of plain-text fragments: one file for the
//! name, one for the role, one per section and one per experience entry, plus an optional photo.
//!
//! The work is split in three stages. The fragments are read and normalized (`content`), laid out
//! onto A4 pages as a list of drawing operations (`composer` on top of `layout`, producing a
//! `document::Document`), and finally converted into a PDF document (`pdf`) which is written to a
//! file named after the person, the role and the time of generation (`output`).
//!
//! The entry point for most uses is `composer::generate_resume`, driven by a
//! `configuration::ComposerConfiguration`.

/// Loading of the resume fragments from the content directory.
///
/// Every fragment goes through the same normalization: surrounding whitespace is stripped, the
/// text is decomposed to the NFKD form, the private-use bullet of the Symbol font becomes the
/// standard bullet, and hyphen list markers at the beginning of a line become bullets as well.
/// A fragment whose file is missing is simply empty, which leaves its section out of the resume.
pub mod content;

/// The section order, the styling of every element and the top-level `generate_resume` run.
pub mod composer;

/// The configuration of a run, read from a JSON file in which every field is optional.
pub mod configuration;

/// The module where the `Document` interface is presented.
///
/// # Introduction
///
/// The `Document` struct is the intermediate representation between the layout and the PDF:
/// pages, text with its position, color, font style and size, lines and images, all expressed
/// in millimeters from the top-left corner of the page. It can be serialized to JSON in order
/// to inspect a layout, and it is converted into a `PdfDocument` with `to_pdf_document` (or
/// directly written with `save_to_pdf_file`).
pub mod document;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The `ContextError` type is always returned from a `Result` type, which means that the caller can expect to obtain an explanation
/// whenever a function returns an error. If an error happened in a function which was called inside a function of this library,
/// then the caller also obtains the description of this propagated error.
pub mod error;

/// Font resolution: the first configured TrueType family whose three styles load is used,
/// otherwise the standard Helvetica family. Both measure text for the layout.
pub mod fonts;

/// The page canvas the composer draws onto: cells, wrapped text, rules, images, automatic page
/// breaks and page footers.
pub mod layout;

/// Derivation of the output file name and preparation of the output directory.
pub mod output;

/// The module where the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. It offers convenience functions
/// such as `add_page`, `add_true_type_font`, `write_text_to_page`, `place_image_to_page`, `write_all`
/// and `save_to_file`, which allow to build a PDF document while keeping the `lopdf` object model
/// mostly hidden below a curtain of private methods.
///
/// TrueType fonts are embedded in full as CID fonts with the `Identity-H` encoding, so text is
/// written as glyph IDs and a `ToUnicode` map keeps it searchable. The standard Type1 fonts
/// are written as plain ASCII.
pub mod pdf;
