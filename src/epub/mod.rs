//! EPUB container writing.

pub mod writer;

pub use writer::{write_epub, write_epub_to_writer};
