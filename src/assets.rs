//! Asset registry: fonts, images, and the cover.
//!
//! Discovers binary resources referenced from the stylesheet and the
//! document, reads them from their per-kind directory, and registers each
//! one into the book at most once under its bare filename.

use std::fs;
use std::path::PathBuf;

use cssparser::{Parser, ParserInput, Token};

use crate::book::Book;
use crate::util;

/// Registers binary assets into the [`Book`] being assembled.
///
/// Registration is idempotent per unique filename: the second call for the
/// same file is a no-op returning the already-assigned packaged name.
pub struct AssetRegistry<'a> {
    book: &'a mut Book,
    fonts_dir: PathBuf,
    images_dir: PathBuf,
}

impl<'a> AssetRegistry<'a> {
    pub fn new(book: &'a mut Book, fonts_dir: PathBuf, images_dir: PathBuf) -> Self {
        Self {
            book,
            fonts_dir,
            images_dir,
        }
    }

    /// Register a font file from the fonts directory.
    ///
    /// Returns the packaged name (the bare filename), or `None` when the file
    /// does not exist.
    pub fn register_font(&mut self, filename: &str) -> Option<String> {
        let id = util::resource_id("font", filename);
        if self.book.contains_id(&id) {
            return Some(filename.to_string());
        }

        let path = self.fonts_dir.join(filename);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(_) => {
                log::warn!("font {} not found; skipping", path.display());
                return None;
            }
        };

        self.book
            .add_resource(id, filename, util::font_mime(filename), data);
        log::info!("registered font {filename}");
        Some(filename.to_string())
    }

    /// Register an image file from the images directory.
    ///
    /// Returns the packaged name (the bare filename), or `None` when the file
    /// does not exist.
    pub fn register_image(&mut self, filename: &str) -> Option<String> {
        let id = util::resource_id("img", filename);
        if self.book.contains_id(&id) {
            return Some(filename.to_string());
        }

        let path = self.images_dir.join(filename);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(_) => return None,
        };

        self.book
            .add_resource(id, filename, util::image_mime(filename), data);
        log::info!("registered image {filename}");
        Some(filename.to_string())
    }

    /// Read the cover image bytes from the images directory.
    pub fn load_cover(&mut self, filename: &str) -> Option<Vec<u8>> {
        let path = self.images_dir.join(filename);
        match fs::read(&path) {
            Ok(data) => {
                log::info!("cover image {filename} loaded");
                Some(data)
            }
            Err(_) => {
                log::warn!("cover image {} not found; book will have no cover", path.display());
                None
            }
        }
    }

    /// Register every font referenced from `url(...)` in the stylesheet and
    /// rewrite those references to bare filenames.
    ///
    /// Only references whose file exists under the fonts directory are
    /// rewritten; everything else is left as-is.
    pub fn rewrite_stylesheet(&mut self, css: &str) -> String {
        let mut out = css.to_string();
        for raw_url in extract_css_urls(css) {
            let filename = util::base_filename(&raw_url);
            if filename.is_empty() {
                continue;
            }
            if self.register_font(&filename).is_some() {
                out = out.replace(&raw_url, &filename);
            }
        }
        out
    }
}

/// Every unique `url(...)` reference in the stylesheet, in order of first
/// occurrence. Handles both quoted and unquoted forms.
fn extract_css_urls(css: &str) -> Vec<String> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut urls = Vec::new();
    collect_urls(&mut parser, &mut urls);
    urls
}

fn collect_urls<'i>(parser: &mut Parser<'i, '_>, urls: &mut Vec<String>) {
    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::UnquotedUrl(url) => {
                let url = url.to_string();
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                let _ = parser.parse_nested_block(
                    |block| -> Result<(), cssparser::ParseError<'i, ()>> {
                        while let Ok(token) = block.next_including_whitespace() {
                            if let Token::QuotedString(s) = token {
                                let url = s.to_string();
                                if !urls.contains(&url) {
                                    urls.push(url);
                                }
                            }
                        }
                        Ok(())
                    },
                );
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(
                    |block| -> Result<(), cssparser::ParseError<'i, ()>> {
                        collect_urls(block, urls);
                        Ok(())
                    },
                );
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const FONT_FACE_CSS: &str = r#"
@font-face {
  font-family: "Lato";
  src: url(fonts/Lato-Regular.ttf?v=2) format("truetype");
}
@font-face {
  font-family: "Lato";
  src: url("fonts/Lato-Bold.ttf") format("truetype");
}
body { font-family: "Lato", serif; }
"#;

    fn registry_dirs() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        let images = dir.path().join("images");
        fs::create_dir_all(&fonts).unwrap();
        fs::create_dir_all(&images).unwrap();
        (dir, fonts, images)
    }

    #[test]
    fn test_extract_css_urls() {
        let urls = extract_css_urls(FONT_FACE_CSS);
        assert_eq!(urls, ["fonts/Lato-Regular.ttf?v=2", "fonts/Lato-Bold.ttf"]);
    }

    #[test]
    fn test_extract_css_urls_dedupes() {
        let css = "a { background: url(x.png); } b { background: url(x.png); }";
        assert_eq!(extract_css_urls(css), ["x.png"]);
    }

    #[test]
    fn test_rewrite_stylesheet_registers_existing_fonts() {
        let (_dir, fonts, images) = registry_dirs();
        fs::write(fonts.join("Lato-Regular.ttf"), b"font-bytes").unwrap();
        // Lato-Bold.ttf intentionally absent

        let mut book = Book::default();
        let mut registry = AssetRegistry::new(&mut book, fonts, images);
        let rewritten = registry.rewrite_stylesheet(FONT_FACE_CSS);

        // Existing font: url rewritten to the bare filename
        assert!(rewritten.contains("url(Lato-Regular.ttf)"));
        // Missing font: reference untouched
        assert!(rewritten.contains("fonts/Lato-Bold.ttf"));

        let font = book.get_resource("Lato-Regular.ttf").expect("registered");
        assert_eq!(font.media_type, "font/ttf");
        assert_eq!(font.data, b"font-bytes");
        assert!(book.get_resource("Lato-Bold.ttf").is_none());
    }

    #[test]
    fn test_register_image_is_idempotent() {
        let (_dir, fonts, images) = registry_dirs();
        fs::write(images.join("a.jpg"), b"jpeg-bytes").unwrap();

        let mut book = Book::default();
        let mut registry = AssetRegistry::new(&mut book, fonts, images);

        assert_eq!(registry.register_image("a.jpg").as_deref(), Some("a.jpg"));
        assert_eq!(registry.register_image("a.jpg").as_deref(), Some("a.jpg"));
        assert_eq!(
            book.resources.iter().filter(|r| r.href == "a.jpg").count(),
            1
        );
    }

    #[test]
    fn test_register_missing_image_returns_none() {
        let (_dir, fonts, images) = registry_dirs();
        let mut book = Book::default();
        let mut registry = AssetRegistry::new(&mut book, fonts, images);
        assert!(registry.register_image("ghost.jpg").is_none());
        assert!(book.resources.is_empty());
    }

    #[test]
    fn test_image_mime_selection() {
        let (_dir, fonts, images) = registry_dirs();
        fs::write(images.join("a.png"), b"png").unwrap();
        fs::write(images.join("b.jpg"), b"jpg").unwrap();

        let mut book = Book::default();
        let mut registry = AssetRegistry::new(&mut book, fonts, images);
        registry.register_image("a.png");
        registry.register_image("b.jpg");

        assert_eq!(book.get_resource("a.png").unwrap().media_type, "image/png");
        assert_eq!(book.get_resource("b.jpg").unwrap().media_type, "image/jpeg");
    }

    #[test]
    fn test_load_cover() {
        let (_dir, fonts, images) = registry_dirs();
        fs::write(images.join("cover.jpg"), b"cover-bytes").unwrap();

        let mut book = Book::default();
        let mut registry = AssetRegistry::new(&mut book, fonts, images);
        assert_eq!(registry.load_cover("cover.jpg").as_deref(), Some(&b"cover-bytes"[..]));
        assert!(registry.load_cover("missing.jpg").is_none());
    }
}
