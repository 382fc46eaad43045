//! Format-agnostic book model assembled by the pipeline and consumed by the
//! EPUB writer.

/// A book under construction: metadata, packaged resources, reading order.
///
/// Resources keep insertion order so the generated package is stable from
/// run to run.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    /// Everything packaged by bare filename: stylesheet, fonts, images,
    /// content documents.
    pub resources: Vec<Resource>,
    /// Manifest ids of content documents in reading order. The generated
    /// navigation document always precedes these in the spine.
    pub spine: Vec<String>,
    /// Table of contents entries, in reading order.
    pub toc: Vec<TocEntry>,
    /// Manifest id of the cover image resource, when present.
    pub cover_id: Option<String>,
}

/// Book metadata, populated from the settings `metadata` section.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: String,
    pub author: String,
    pub language: String,
    pub identifier: String,
    pub description: String,
    pub publisher: String,
    pub rights: String,
    pub subject: String,
    /// Creation timestamp, `YYYY-MM-DDTHH:MM:SS+00:00`.
    pub created: String,
}

/// A packaged resource: content document, image, CSS, or font.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: String,
    /// Bare filename inside the flat packaging namespace.
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// A table of contents entry (flat; this pipeline produces no nesting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
}

impl Book {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Add a resource. The caller guarantees id uniqueness; use
    /// [`Book::contains_id`] to deduplicate.
    pub fn add_resource(
        &mut self,
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) {
        self.resources.push(Resource {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            data,
        });
    }

    /// Whether a resource with this manifest id is already packaged.
    pub fn contains_id(&self, id: &str) -> bool {
        self.resources.iter().any(|r| r.id == id)
    }

    pub fn get_resource(&self, href: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.href == href)
    }

    /// Register the cover image bytes and mark them as the cover.
    pub fn set_cover(&mut self, filename: impl Into<String>, media_type: &str, data: Vec<u8>) {
        let id = "cover-image".to_string();
        self.add_resource(id.clone(), filename, media_type, data);
        self.cover_id = Some(id);
    }

    /// Add a content document and append it to spine and TOC.
    pub fn add_content(&mut self, id: impl Into<String>, href: &str, title: &str, xhtml: String) {
        let id = id.into();
        self.add_resource(
            id.clone(),
            href,
            "application/xhtml+xml",
            xhtml.into_bytes(),
        );
        self.spine.push(id);
        self.toc.push(TocEntry {
            title: title.to_string(),
            href: href.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_keep_insertion_order() {
        let mut book = Book::default();
        book.add_resource("style_a", "a.css", "text/css", vec![]);
        book.add_resource("img_b", "b.jpg", "image/jpeg", vec![]);
        book.add_resource("font_c", "c.ttf", "font/ttf", vec![]);

        let hrefs: Vec<_> = book.resources.iter().map(|r| r.href.as_str()).collect();
        assert_eq!(hrefs, ["a.css", "b.jpg", "c.ttf"]);
    }

    #[test]
    fn test_add_content_updates_spine_and_toc() {
        let mut book = Book::default();
        book.add_content("chap_0", "chap_0.xhtml", "Intro", "<html/>".to_string());
        book.add_content("chap_1", "chap_1.xhtml", "Ch1", "<html/>".to_string());

        assert_eq!(book.spine, ["chap_0", "chap_1"]);
        assert_eq!(book.toc[0].title, "Intro");
        assert_eq!(book.toc[1].href, "chap_1.xhtml");
    }

    #[test]
    fn test_set_cover() {
        let mut book = Book::default();
        book.set_cover("cover.jpg", "image/jpeg", vec![1, 2, 3]);
        assert_eq!(book.cover_id.as_deref(), Some("cover-image"));
        assert!(book.contains_id("cover-image"));
    }
}
