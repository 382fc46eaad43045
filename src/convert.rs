//! End-to-end pipeline driver.
//!
//! Resolve settings, audit the referenced resources, parse the source
//! document, pull in assets, segment into chapters, and write the EPUB.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::assets::AssetRegistry;
use crate::audit;
use crate::book::{Book, Metadata};
use crate::config::{self, Settings};
use crate::dom::sink::parse_document;
use crate::epub;
use crate::error::{Error, Result};
use crate::segment;
use crate::util;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct Summary {
    pub output: PathBuf,
    pub chapters: usize,
    pub has_preface: bool,
    pub has_cover: bool,
}

/// Run the full pipeline from a settings file.
///
/// The settings file is created or repaired as needed; all relative paths in
/// it resolve against its parent directory.
pub fn convert(config_path: &Path) -> Result<Summary> {
    let settings = config::resolve_settings(config_path, &Settings::template())?;
    let base_dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    convert_with_settings(&base_dir, &settings)
}

/// Run the pipeline with already-resolved settings.
pub fn convert_with_settings(base_dir: &Path, settings: &Settings) -> Result<Summary> {
    let paths = &settings.config;

    let report = audit::audit(base_dir, paths);
    for missing in &report.missing {
        log::warn!(
            "missing {}: {}",
            missing.kind.describe(),
            missing.path.display()
        );
    }
    if report.is_fatal() {
        return Err(Error::MissingSource(base_dir.join(&paths.source_html)));
    }

    let created = Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string();
    let meta = &settings.metadata;
    let mut book = Book::new(Metadata {
        title: meta.title.clone(),
        author: meta.author.clone(),
        language: meta.language.clone(),
        identifier: String::new(),
        description: meta.description.clone(),
        publisher: meta.publisher.clone(),
        rights: meta.rights.clone(),
        subject: meta.subject.clone(),
        created,
    });

    // Stylesheet is packaged under its bare filename; chapters link to it
    let css_name = util::base_filename(&paths.source_css);
    let raw_css = match fs::read(base_dir.join(&paths.source_css)) {
        Ok(bytes) => util::decode_text(&bytes).into_owned(),
        Err(_) => String::new(),
    };

    let source_bytes = fs::read(base_dir.join(&paths.source_html))?;
    let mut dom = parse_document(&util::decode_text(&source_bytes));

    let (css_text, cover, chapters) = {
        let mut registry = AssetRegistry::new(
            &mut book,
            base_dir.join(&paths.folder_fonts),
            base_dir.join(&paths.folder_images),
        );
        let css_text = registry.rewrite_stylesheet(&raw_css);
        let cover = registry.load_cover(&paths.cover_image);
        let chapters = segment::segment_document(&mut dom, &mut registry, &css_name);
        (css_text, cover, chapters)
    };

    if chapters.is_empty() {
        return Err(Error::EmptyBook);
    }

    book.add_resource(
        util::resource_id("style", &css_name),
        css_name.clone(),
        "text/css",
        css_text.into_bytes(),
    );

    let has_cover = cover.is_some();
    if let Some(data) = cover {
        let filename = util::base_filename(&paths.cover_image);
        let media_type = util::image_mime(&filename);
        book.set_cover(filename, media_type, data);
    }

    let preface = load_preface(base_dir, paths, &css_name);
    let has_preface = preface.is_some();
    if let Some((filename, content)) = preface {
        let id = util::resource_id("preface", &filename);
        book.add_content(id, &filename, "Preface", content);
    }

    let chapter_count = chapters.len();
    for chapter in chapters {
        let id = util::resource_id("chap", &chapter.filename);
        book.add_content(id, &chapter.filename, &chapter.title, chapter.content);
    }

    let output = base_dir.join(&paths.output_epub);
    epub::write_epub(&book, &output)?;
    log::info!("wrote {} with {chapter_count} chapters", output.display());

    Ok(Summary {
        output,
        chapters: chapter_count,
        has_preface,
        has_cover,
    })
}

/// Load and wrap the configured preface document, if any.
///
/// Returns the packaged filename and the wrapped XHTML. A configured but
/// unreadable preface degrades to none.
fn load_preface(
    base_dir: &Path,
    paths: &crate::config::BookPaths,
    stylesheet: &str,
) -> Option<(String, String)> {
    if !paths.has_preface() {
        log::info!("no preface configured");
        return None;
    }

    let path = base_dir.join(&paths.preface);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            log::warn!("preface {} not readable; skipping", path.display());
            return None;
        }
    };

    let preface_dom = parse_document(&util::decode_text(&bytes));
    let content = segment::preface_document(&preface_dom, stylesheet);
    let filename = util::base_filename(&paths.preface);
    log::info!("preface {filename} included");
    Some((filename, content))
}
