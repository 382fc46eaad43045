//! # bindery
//!
//! Convert a single flat-structured HTML document into an EPUB book.
//!
//! The source document uses two custom elements: `<break></break>` delimits
//! chapters, `<hide>...</hide>` marks subtrees to drop. Iframes pointing at
//! `.html` pages are replaced by same-named `.jpg` images, local CSS/font/
//! image assets are packaged by bare filename, and a JSON settings file
//! (created and repaired automatically) supplies metadata and paths.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//!
//! let summary = bindery::convert(Path::new("book.json")).unwrap();
//! println!("{} chapters -> {}", summary.chapters, summary.output.display());
//! ```
//!
//! The pipeline is linear: resolve settings, audit the referenced paths,
//! parse the document, register assets, segment into chapters on marker
//! boundaries, and write the container. Only two conditions abort a run: a
//! missing source document and zero retained chapters.

pub mod assets;
pub mod audit;
pub mod book;
pub mod config;
pub mod convert;
pub mod dom;
pub mod epub;
pub mod error;
pub mod segment;
pub(crate) mod util;

pub use book::{Book, Metadata, Resource, TocEntry};
pub use config::Settings;
pub use convert::{Summary, convert, convert_with_settings};
pub use error::{Error, Result};
