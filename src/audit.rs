//! Pre-flight existence checks for everything the settings reference.
//!
//! All missing items are collected and reported together; only a missing
//! source document makes the run fatal. Everything else degrades (a missing
//! cover just yields a coverless book).

use std::path::{Path, PathBuf};

use crate::config::BookPaths;

/// What kind of configured resource is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    FontsDir,
    ImagesDir,
    SourceHtml,
    Stylesheet,
    Preface,
    Cover,
}

impl MissingKind {
    pub fn describe(self) -> &'static str {
        match self {
            MissingKind::FontsDir => "fonts directory",
            MissingKind::ImagesDir => "images directory",
            MissingKind::SourceHtml => "source document",
            MissingKind::Stylesheet => "stylesheet",
            MissingKind::Preface => "preface document",
            MissingKind::Cover => "cover image",
        }
    }
}

/// A configured path that does not exist on disk.
#[derive(Debug, Clone)]
pub struct Missing {
    pub kind: MissingKind,
    pub path: PathBuf,
}

/// Result of the audit: every missing item, in check order.
#[derive(Debug, Default)]
pub struct AuditReport {
    pub missing: Vec<Missing>,
}

impl AuditReport {
    /// True when processing cannot continue (the source document is absent).
    pub fn is_fatal(&self) -> bool {
        self.missing
            .iter()
            .any(|m| m.kind == MissingKind::SourceHtml)
    }

    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }

    fn check(&mut self, kind: MissingKind, path: PathBuf) {
        if !path.exists() {
            self.missing.push(Missing { kind, path });
        }
    }
}

/// Check every path named by the `config` section, without short-circuiting.
pub fn audit(base_dir: &Path, paths: &BookPaths) -> AuditReport {
    let mut report = AuditReport::default();

    report.check(MissingKind::FontsDir, base_dir.join(&paths.folder_fonts));
    report.check(MissingKind::ImagesDir, base_dir.join(&paths.folder_images));
    report.check(MissingKind::SourceHtml, base_dir.join(&paths.source_html));
    report.check(MissingKind::Stylesheet, base_dir.join(&paths.source_css));

    if paths.has_preface() {
        report.check(MissingKind::Preface, base_dir.join(&paths.preface));
    }

    // The cover lives inside the images directory
    report.check(
        MissingKind::Cover,
        base_dir.join(&paths.folder_images).join(&paths.cover_image),
    );

    report
}
