//! Chapter segmentation and content rewriting.
//!
//! This is the heart of the pipeline: the flat body of the source document is
//! cleaned up (hidden sections dropped, iframes turned into images), split
//! into chapter runs on `<break>` boundaries, and every run is rewritten into
//! the flat packaging namespace before being serialized as an XHTML chapter.

use crate::assets::AssetRegistry;
use crate::dom::serialize::{serialize_children, serialize_node};
use crate::dom::{Dom, ElemKind, NodeId};
use crate::util;

/// The generated navigation document; `#index` links are retargeted here.
pub use crate::epub::writer::NAV_DOC;

/// Anchor target that means "back to the table of contents".
const INDEX_TARGET: &str = "#index";

const TITLE_MAX_CHARS: usize = 80;

/// A retained chapter, ready for packaging.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Candidate index; dropped candidates leave gaps in the numbering.
    pub index: usize,
    pub title: String,
    pub filename: String,
    /// Complete XHTML document.
    pub content: String,
}

/// Run the whole segmentation pass over a parsed source document.
///
/// `stylesheet` is the packaged (bare) name of the shared stylesheet.
/// Returns the retained chapters; an empty result means the book has no
/// content and generation must abort.
pub fn segment_document(
    dom: &mut Dom,
    registry: &mut AssetRegistry<'_>,
    stylesheet: &str,
) -> Vec<Chapter> {
    strip_hidden(dom);
    convert_iframes(dom);

    let Some(body) = dom.body() else {
        return Vec::new();
    };
    let runs = split_runs(dom, body);

    let mut chapters = Vec::new();
    for (index, run) in runs.into_iter().enumerate() {
        let title = derive_title(dom, &run, index + 1);

        for &node in &run {
            rewrite_images(dom, node, registry);
            rewrite_index_links(dom, node);
            rewrite_image_links(dom, node);
        }

        if !run.iter().any(|&node| has_value(dom, node)) {
            log::info!("chapter candidate {index} has no content; dropped");
            continue;
        }

        let mut body_xhtml = String::new();
        for &node in &run {
            body_xhtml.push_str(&serialize_node(dom, node));
        }

        chapters.push(Chapter {
            index,
            title: title.clone(),
            filename: format!("chap_{index}.xhtml"),
            content: xhtml_document(&title, stylesheet, &body_xhtml),
        });
    }

    chapters
}

/// Delete every `<hide>` element together with its subtree.
pub fn strip_hidden(dom: &mut Dom) {
    let hidden = dom.descendants_of_kind(dom.document(), ElemKind::Hide);
    for id in hidden {
        dom.detach(id);
    }
}

/// Replace every `<iframe src="X.html">` with `<img src="X.jpg">`.
///
/// Only the `width` attribute is carried over. Frames pointing at anything
/// other than an `.html` page are left alone.
pub fn convert_iframes(dom: &mut Dom) {
    let iframes = dom.descendants_of_kind(dom.document(), ElemKind::Iframe);
    for iframe in iframes {
        let Some(src) = dom.attr(iframe, "src").map(str::to_owned) else {
            continue;
        };
        let filename = util::base_filename(&src);
        let Some(stem) = strip_suffix_ci(&filename, ".html") else {
            continue;
        };

        let image_name = format!("{stem}.jpg");
        let width = dom.attr(iframe, "width").map(str::to_owned);

        let img = match width {
            Some(w) => dom.create_named_element("img", &[("src", &image_name), ("width", &w)]),
            None => dom.create_named_element("img", &[("src", &image_name)]),
        };
        dom.replace(iframe, img);
    }
}

/// Case-insensitive ASCII suffix strip; byte-wise so arbitrary input cannot
/// split a char boundary.
fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let (bytes, pat) = (s.as_bytes(), suffix.as_bytes());
    if bytes.len() >= pat.len() && bytes[bytes.len() - pat.len()..].eq_ignore_ascii_case(pat) {
        Some(&s[..s.len() - suffix.len()])
    } else {
        None
    }
}

/// Split the body-level nodes into candidate chapter runs.
///
/// Comments and `hr` elements are discarded. A `<break>` marker closes the
/// current non-empty run and becomes the first node of the next one, so a
/// body with k markers yields k+1 candidates when content precedes the first
/// marker.
pub fn split_runs(dom: &Dom, body: NodeId) -> Vec<Vec<NodeId>> {
    let children: Vec<NodeId> = dom.children(body).collect();

    let mut runs = Vec::new();
    let mut current: Vec<NodeId> = Vec::new();
    for child in children {
        if dom.is_comment(child) {
            continue;
        }
        match dom.kind(child) {
            Some(ElemKind::Rule) => continue,
            Some(ElemKind::Marker) => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
                current.push(child);
            }
            _ => current.push(child),
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Chapter title: stripped text of the first top-level `h1`/`h2` in the run,
/// truncated to 80 characters; otherwise `"Chapter {ordinal}"`.
fn derive_title(dom: &Dom, run: &[NodeId], ordinal: usize) -> String {
    for &node in run {
        if dom.kind(node) == Some(ElemKind::Heading) {
            let text = dom.stripped_text(node);
            return util::truncate_chars(&text, TITLE_MAX_CHARS).to_string();
        }
    }
    format!("Chapter {ordinal}")
}

/// Route every image under `root` through the registry and rewrite its src to
/// the bare filename.
///
/// The src is rewritten even when the file is missing, so the markup stays
/// stable across runs; the dangling reference is logged.
fn rewrite_images(dom: &mut Dom, root: NodeId, registry: &mut AssetRegistry<'_>) {
    for img in dom.descendants_of_kind(root, ElemKind::Image) {
        let Some(src) = dom.attr(img, "src").map(str::to_owned) else {
            continue;
        };
        let filename = util::base_filename(&src);
        if filename.is_empty() {
            continue;
        }
        if registry.register_image(&filename).is_none() {
            log::warn!("image {filename} not found; reference will dangle");
        }
        dom.set_attr(img, "src", &filename);
    }
}

/// Retarget `#index` anchors to the navigation document.
///
/// When such an anchor wraps a `<button>`, the anchor's content collapses to
/// the button's text and the anchor is tagged with the `button` class so the
/// stylesheet can keep its appearance.
fn rewrite_index_links(dom: &mut Dom, root: NodeId) {
    for anchor in dom.descendants_of_kind(root, ElemKind::Anchor) {
        if dom.attr(anchor, "href") != Some(INDEX_TARGET) {
            continue;
        }
        dom.set_attr(anchor, "href", NAV_DOC);

        let button = dom
            .descendants_of_kind(anchor, ElemKind::Button)
            .into_iter()
            .next();
        if let Some(button) = button {
            let label = dom.stripped_text(button);
            dom.clear_children(anchor);
            let text = dom.create_text(label);
            dom.append(anchor, text);
            if let Some(el) = dom.element_mut(anchor) {
                el.add_class("button");
            }
        }
    }
}

/// Retarget anchors that point at images (lightbox style) to the bare
/// filename, treating them as same-archive references.
fn rewrite_image_links(dom: &mut Dom, root: NodeId) {
    for anchor in dom.descendants_of_kind(root, ElemKind::Anchor) {
        let Some(href) = dom.attr(anchor, "href").map(str::to_owned) else {
            continue;
        };
        let lower = href.to_ascii_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png") {
            dom.set_attr(anchor, "href", &util::base_filename(&href));
        }
    }
}

/// A run is worth keeping when it has non-whitespace text or an image.
fn has_value(dom: &Dom, node: NodeId) -> bool {
    if dom.has_text(node) {
        return true;
    }
    dom.kind(node) == Some(ElemKind::Image)
        || !dom.descendants_of_kind(node, ElemKind::Image).is_empty()
}

/// Wrap a serialized body fragment in a complete XHTML document referencing
/// the shared stylesheet.
pub fn xhtml_document(title: &str, stylesheet: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head>\n\
         <title>{}</title>\n\
         <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>\n\
         </head>\n\
         <body>{}</body>\n\
         </html>\n",
        escape_title(title),
        stylesheet,
        body
    )
}

/// Extract a preface body from an independently parsed document and wrap it
/// in the shared document shell.
pub fn preface_document(preface_dom: &Dom, stylesheet: &str) -> String {
    let body = match preface_dom.body() {
        Some(body) => serialize_children(preface_dom, body),
        None => serialize_children(preface_dom, preface_dom.document()),
    };
    xhtml_document("Preface", stylesheet, &body)
}

fn escape_title(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
