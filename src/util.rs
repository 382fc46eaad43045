//! Small helpers shared across the pipeline.

use std::borrow::Cow;

/// Decode raw file bytes to text.
///
/// Tries UTF-8 first (BOM handled automatically by encoding_rs), then falls
/// back to Windows-1252, which covers most legacy exports.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Base filename of a URL or path reference.
///
/// Query/fragment suffixes are stripped, directory components discarded, and
/// percent-escapes decoded, so `bilder/TAG05.jpg?v=2` becomes `TAG05.jpg`.
pub fn base_filename(reference: &str) -> String {
    let trimmed = reference.split(['?', '#']).next().unwrap_or(reference);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    percent_encoding::percent_decode_str(name)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_else(|_| name.to_string())
}

/// Lowercased extension of a filename, without the dot.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// MIME type for a font file, by extension.
pub fn font_mime(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/vnd.ms-opentype",
    }
}

/// MIME type for an image file, by extension. Everything that is not PNG is
/// packaged as JPEG.
pub fn image_mime(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Derive a manifest identifier from a filename, e.g. `img_TAG05_jpg`.
pub fn resource_id(prefix: &str, filename: &str) -> String {
    format!("{}_{}", prefix, filename.replace(['/', '.', ' ', '-'], "_"))
}

/// Truncate a string to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Generate a `urn:uuid:` identifier seeded from the current time.
///
/// Not cryptographically secure, which is fine for a package identifier.
pub fn urn_uuid() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed);

    let mut state = seed;
    let mut bytes = [0u8; 16];
    for byte in &mut bytes {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *byte = (state >> 33) as u8;
    }
    // Version 4, variant 2
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "urn:uuid:{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_filename() {
        assert_eq!(base_filename("bilder/TAG05.jpg"), "TAG05.jpg");
        assert_eq!(base_filename("fonts/Lato.woff2?v=1.2#iefix"), "Lato.woff2");
        assert_eq!(base_filename("cover.jpg"), "cover.jpg");
        assert_eq!(base_filename("a%20b.png"), "a b.png");
        assert_eq!(base_filename(""), "");
    }

    #[test]
    fn test_font_mime() {
        assert_eq!(font_mime("a.ttf"), "font/ttf");
        assert_eq!(font_mime("a.otf"), "font/otf");
        assert_eq!(font_mime("a.woff"), "font/woff");
        assert_eq!(font_mime("a.WOFF2"), "font/woff2");
        assert_eq!(font_mime("a.eot"), "application/vnd.ms-opentype");
    }

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime("a.png"), "image/png");
        assert_eq!(image_mime("a.PNG"), "image/png");
        assert_eq!(image_mime("a.jpg"), "image/jpeg");
        assert_eq!(image_mime("a.jpeg"), "image/jpeg");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 80), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte characters are not split
        assert_eq!(truncate_chars("äöü", 2), "äö");
    }

    #[test]
    fn test_urn_uuid_shape() {
        let id = urn_uuid();
        assert!(id.starts_with("urn:uuid:"));
        assert_eq!(id.len(), "urn:uuid:".len() + 36);
    }
}
