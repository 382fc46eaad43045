//! Self-healing JSON settings.
//!
//! The settings file has two sections: `metadata` (what goes into the book)
//! and `config` (where the inputs live). A missing or corrupt file degrades
//! to the default template; individual missing keys are filled in from the
//! template. Whenever anything was repaired, the merged object is written
//! back so the next run starts from a complete file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Resolved settings: the `metadata` and `config` sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub metadata: BookMetadata,
    pub config: BookPaths,
}

/// Metadata strings passed through to the packaged book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub description: String,
    pub publisher: String,
    pub rights: String,
    pub subject: String,
}

/// Input/output paths, relative to the settings file's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookPaths {
    pub source_html: String,
    pub source_css: String,
    pub folder_fonts: String,
    pub folder_images: String,
    pub cover_image: String,
    /// Preface document filename, or the sentinel `"none"` (case-insensitive).
    pub preface: String,
    pub output_epub: String,
}

impl BookPaths {
    /// Whether a preface document is configured.
    pub fn has_preface(&self) -> bool {
        !self.preface.eq_ignore_ascii_case("none")
    }
}

impl Settings {
    /// The default template used to create and repair settings files.
    pub fn template() -> Settings {
        Settings {
            metadata: BookMetadata {
                title: "Your Book Title".to_string(),
                author: "Author Name".to_string(),
                language: "en".to_string(),
                description: "Book description".to_string(),
                publisher: "Author Name".to_string(),
                rights: "All rights reserved".to_string(),
                subject: "General".to_string(),
            },
            config: BookPaths {
                source_html: "index.html".to_string(),
                source_css: "style.css".to_string(),
                folder_fonts: "fonts".to_string(),
                folder_images: "images".to_string(),
                cover_image: "cover.jpg".to_string(),
                preface: "none".to_string(),
                output_epub: "book.epub".to_string(),
            },
        }
    }
}

/// Load the settings file at `path`, repairing it against `template`.
///
/// Missing file, unreadable JSON, and missing keys all degrade to template
/// values rather than failing; any repair is persisted back to `path` with
/// human-readable indentation (non-ASCII text stays literal).
pub fn resolve_settings(path: &Path, template: &Settings) -> Result<Settings> {
    let template_value = serde_json::to_value(template)?;
    let mut dirty = false;

    let mut value = match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(err) => {
                log::warn!(
                    "settings file {} is not valid JSON ({err}); using defaults",
                    path.display()
                );
                dirty = true;
                template_value.clone()
            }
        },
        Err(_) => {
            log::warn!(
                "settings file {} not found; creating it with defaults",
                path.display()
            );
            dirty = true;
            template_value.clone()
        }
    };

    heal(&mut value, &template_value, &mut dirty);

    if dirty {
        let mut pretty = serde_json::to_string_pretty(&value)?;
        pretty.push('\n');
        if let Err(err) = fs::write(path, pretty) {
            log::warn!(
                "could not persist repaired settings to {}: {err}",
                path.display()
            );
        }
    }

    match serde_json::from_value::<Settings>(value) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            log::warn!("settings have unusable values ({err}); using defaults");
            Ok(template.clone())
        }
    }
}

/// Fill every section/key present in `template` but absent from `value`.
fn heal(value: &mut Value, template: &Value, dirty: &mut bool) {
    let Value::Object(template_map) = template else {
        return;
    };

    let map = match value {
        Value::Object(map) => map,
        _ => {
            log::warn!("settings root is not an object; restoring defaults");
            *value = template.clone();
            *dirty = true;
            return;
        }
    };

    for (section, template_section) in template_map {
        match map.get_mut(section) {
            None => {
                log::warn!("settings section '{section}' was missing; restored");
                map.insert(section.clone(), template_section.clone());
                *dirty = true;
            }
            Some(loaded_section) => {
                let Value::Object(template_keys) = template_section else {
                    continue;
                };
                let loaded = match loaded_section {
                    Value::Object(loaded) => loaded,
                    _ => {
                        log::warn!("settings section '{section}' is not an object; restored");
                        *loaded_section = template_section.clone();
                        *dirty = true;
                        continue;
                    }
                };
                for (key, default) in template_keys {
                    if !loaded.contains_key(key) {
                        log::warn!("settings key '{section}.{key}' was missing; default set");
                        loaded.insert(key.clone(), default.clone());
                        *dirty = true;
                    }
                }
            }
        }
    }
}
