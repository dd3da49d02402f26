//! Font format checks
//!
//! The extension comes from the download URL; the payload must start with a
//! TrueType, OpenType or collection signature.

use crate::error::{AgentError, AgentResult};

/// Extension used when the URL carries none
pub const DEFAULT_EXTENSION: &str = ".ttf";

/// Detected font container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    /// `00 01 00 00` or `true`
    TrueType,
    /// `OTTO`
    OpenType,
    /// `ttcf`
    Collection,
}

/// Cache extension for a download URL
///
/// Query strings and fragments are ignored. `.ttf` and `.otf` are accepted
/// in any case; a URL without an extension is treated as TrueType.
pub fn font_extension(url: &str) -> AgentResult<&'static str> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);

    let ext = match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return Ok(DEFAULT_EXTENSION),
    };

    match ext.as_str() {
        "ttf" => Ok(".ttf"),
        "otf" => Ok(".otf"),
        _ => Err(AgentError::UnsupportedFormat(format!(".{}", ext))),
    }
}

/// Identify the font container from its first bytes
pub fn sniff_font_format(bytes: &[u8]) -> AgentResult<FontFormat> {
    match bytes.get(..4) {
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"true") => Ok(FontFormat::TrueType),
        Some(b"OTTO") => Ok(FontFormat::OpenType),
        Some(b"ttcf") => Ok(FontFormat::Collection),
        _ => Err(AgentError::UnsupportedFormat(
            "payload is not a TrueType or OpenType font".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_url() {
        assert_eq!(font_extension("https://cdn.example/a/Roboto.ttf").unwrap(), ".ttf");
        assert_eq!(font_extension("https://cdn.example/a/Roboto.OTF").unwrap(), ".otf");
        assert_eq!(font_extension("file:///srv/fonts/x.otf?v=2").unwrap(), ".otf");
        assert_eq!(font_extension("https://cdn.example/download/42").unwrap(), ".ttf");
        assert_eq!(font_extension("https://cdn.example/.hidden").unwrap(), ".ttf");
    }

    #[test]
    fn rejects_other_extensions() {
        let err = font_extension("https://cdn.example/a/Roboto.woff2").unwrap_err();
        assert!(matches!(err, AgentError::UnsupportedFormat(ext) if ext == ".woff2"));
    }

    #[test]
    fn sniffs_signatures() {
        assert_eq!(
            sniff_font_format(b"\x00\x01\x00\x00rest").unwrap(),
            FontFormat::TrueType
        );
        assert_eq!(sniff_font_format(b"true....").unwrap(), FontFormat::TrueType);
        assert_eq!(sniff_font_format(b"OTTO....").unwrap(), FontFormat::OpenType);
        assert_eq!(sniff_font_format(b"ttcf....").unwrap(), FontFormat::Collection);
    }

    #[test]
    fn rejects_non_font_payloads() {
        assert!(sniff_font_format(b"<html>").is_err());
        assert!(sniff_font_format(b"wOF2").is_err());
        assert!(sniff_font_format(b"OT").is_err());
        assert!(sniff_font_format(b"").is_err());
    }
}
