//! Write a [`Book`] to an EPUB 3 container.
//!
//! Produces the mimetype entry, container.xml, the OPF package document, an
//! NCX for EPUB 2 readers, a generated navigation document (the first spine
//! entry), and every packaged resource under `OEBPS/` by bare filename.

use std::io::{self, Seek, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::Book;
use crate::util;

/// Filename of the generated navigation document inside the container.
pub const NAV_DOC: &str = "nav.xhtml";

/// Write a [`Book`] to an EPUB file on disk.
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> io::Result<()> {
    let mut zip = ZipWriter::new(writer);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // mimetype must be first and uncompressed
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    // Identifier generated once, shared between OPF and NCX
    let identifier = if book.metadata.identifier.is_empty() {
        util::urn_uuid()
    } else {
        book.metadata.identifier.clone()
    };

    zip.start_file("OEBPS/content.opf", options_deflate)?;
    zip.write_all(generate_opf(book, &identifier).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", options_deflate)?;
    zip.write_all(generate_ncx(book, &identifier).as_bytes())?;

    zip.start_file(format!("OEBPS/{NAV_DOC}"), options_deflate)?;
    zip.write_all(generate_nav(book).as_bytes())?;

    for resource in &book.resources {
        zip.start_file(format!("OEBPS/{}", resource.href), options_deflate)?;
        zip.write_all(&resource.data)?;
    }

    zip.finish()?;
    Ok(())
}

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn generate_opf(book: &Book, identifier: &str) -> String {
    let meta = &book.metadata;
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&meta.title)
    ));

    let language = if meta.language.is_empty() {
        "en"
    } else {
        &meta.language
    };
    opf.push_str(&format!("    <dc:language>{language}</dc:language>\n"));

    if !meta.author.is_empty() {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(&meta.author)
        ));
    }
    if !meta.description.is_empty() {
        opf.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            escape_xml(&meta.description)
        ));
    }
    if !meta.publisher.is_empty() {
        opf.push_str(&format!(
            "    <dc:publisher>{}</dc:publisher>\n",
            escape_xml(&meta.publisher)
        ));
    }
    if !meta.rights.is_empty() {
        opf.push_str(&format!(
            "    <dc:rights>{}</dc:rights>\n",
            escape_xml(&meta.rights)
        ));
    }
    if !meta.subject.is_empty() {
        opf.push_str(&format!(
            "    <dc:subject>{}</dc:subject>\n",
            escape_xml(&meta.subject)
        ));
    }

    if !meta.created.is_empty() {
        opf.push_str(&format!(
            "    <dc:date>{}</dc:date>\n",
            escape_xml(&meta.created)
        ));
        opf.push_str(&format!(
            "    <meta property=\"dcterms:created\">{}</meta>\n",
            escape_xml(&meta.created)
        ));
        // dcterms:modified wants the terminal-Z form
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            escape_xml(&meta.created.replace("+00:00", "Z"))
        ));
    }

    if book.cover_id.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }

    opf.push_str("  </metadata>\n  <manifest>\n");

    opf.push_str(&format!(
        "    <item id=\"nav\" href=\"{NAV_DOC}\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n"
    ));
    opf.push_str(
        "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
    );

    for resource in &book.resources {
        let properties = if book.cover_id.as_deref() == Some(resource.id.as_str()) {
            " properties=\"cover-image\""
        } else {
            ""
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&resource.id),
            escape_xml(&resource.href),
            escape_xml(&resource.media_type),
            properties
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");

    // Navigation unit always comes first in reading order
    opf.push_str("    <itemref idref=\"nav\"/>\n");
    for idref in &book.spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            escape_xml(idref)
        ));
    }

    opf.push_str("  </spine>\n</package>\n");
    opf
}

fn generate_nav(book: &Book) -> String {
    let mut nav = String::new();

    nav.push_str(
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
"#,
    );
    nav.push_str(&format!(
        "<title>{}</title>\n</head>\n<body>\n",
        escape_xml(&book.metadata.title)
    ));
    nav.push_str("<nav epub:type=\"toc\" id=\"toc\">\n<h1>Table of Contents</h1>\n<ol>\n");

    for entry in &book.toc {
        nav.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&entry.href),
            escape_xml(&entry.title)
        ));
    }

    nav.push_str("</ol>\n</nav>\n</body>\n</html>\n");
    nav
}

fn generate_ncx(book: &Book, identifier: &str) -> String {
    let mut ncx = String::new();

    ncx.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content=""#,
    );
    ncx.push_str(&escape_xml(identifier));
    ncx.push_str(
        r#""/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>"#,
    );
    ncx.push_str(&escape_xml(&book.metadata.title));
    ncx.push_str(
        r#"</text>
  </docTitle>
  <navMap>
"#,
    );

    for (i, entry) in book.toc.iter().enumerate() {
        let play_order = i + 1;
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{play_order}\" playOrder=\"{play_order}\">\n"
        ));
        ncx.push_str(&format!(
            "      <navLabel>\n        <text>{}</text>\n      </navLabel>\n",
            escape_xml(&entry.title)
        ));
        ncx.push_str(&format!(
            "      <content src=\"{}\"/>\n    </navPoint>\n",
            escape_xml(&entry.href)
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;
    use crate::book::Metadata;

    fn sample_book() -> Book {
        let mut book = Book::new(Metadata {
            title: "Reisebegleiter".to_string(),
            author: "Hans".to_string(),
            language: "de".to_string(),
            created: "2026-01-01T12:00:00+00:00".to_string(),
            ..Default::default()
        });
        book.add_resource("style_css", "style.css", "text/css", b"body{}".to_vec());
        book.set_cover("cover.jpg", "image/jpeg", vec![0xff, 0xd8]);
        book.add_content(
            "chap_0",
            "chap_0.xhtml",
            "Intro",
            "<html><body><p>hi</p></body></html>".to_string(),
        );
        book
    }

    fn write_to_buffer(book: &Book) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        write_epub_to_writer(book, &mut buffer).unwrap();
        buffer.into_inner()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_mimetype_first_and_stored() {
        let bytes = write_to_buffer(&sample_book());
        let mut archive = zip::ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn test_opf_contents() {
        let opf = generate_opf(&sample_book(), "urn:uuid:test");
        assert!(opf.contains("<dc:title>Reisebegleiter</dc:title>"));
        assert!(opf.contains("<dc:creator>Hans</dc:creator>"));
        assert!(opf.contains("<dc:language>de</dc:language>"));
        assert!(opf.contains(
            "<meta property=\"dcterms:created\">2026-01-01T12:00:00+00:00</meta>"
        ));
        assert!(opf.contains(
            "<meta property=\"dcterms:modified\">2026-01-01T12:00:00Z</meta>"
        ));
        assert!(opf.contains("properties=\"cover-image\""));
        assert!(opf.contains("<meta name=\"cover\" content=\"cover-image\"/>"));
        // nav first in the spine
        let nav_pos = opf.find("<itemref idref=\"nav\"/>").unwrap();
        let chap_pos = opf.find("<itemref idref=\"chap_0\"/>").unwrap();
        assert!(nav_pos < chap_pos);
    }

    #[test]
    fn test_nav_lists_toc() {
        let nav = generate_nav(&sample_book());
        assert!(nav.contains("<a href=\"chap_0.xhtml\">Intro</a>"));
        assert!(nav.contains("epub:type=\"toc\""));
    }

    #[test]
    fn test_ncx_play_order() {
        let mut book = sample_book();
        book.add_content("chap_1", "chap_1.xhtml", "Ch1", String::new());
        let ncx = generate_ncx(&book, "urn:uuid:test");
        assert!(ncx.contains("playOrder=\"1\""));
        assert!(ncx.contains("playOrder=\"2\""));
        assert!(ncx.contains("<text>Ch1</text>"));
    }

    #[test]
    fn test_resources_written_under_oebps() {
        let bytes = write_to_buffer(&sample_book());
        assert_eq!(read_entry(&bytes, "OEBPS/style.css"), "body{}");
        assert!(read_entry(&bytes, "OEBPS/content.opf").contains("style.css"));
        assert!(read_entry(&bytes, "OEBPS/nav.xhtml").contains("Intro"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a & b < c"), "a &amp; b &lt; c");
        assert_eq!(escape_xml("\"quote'"), "&quot;quote&apos;");
    }
}
