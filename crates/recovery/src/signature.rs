//! Magic-byte signature table and matcher.
//!
//! Rules are tested in table order and the first one that matches wins, so
//! specific variants (WebP inside RIFF, brand-specific ISO media files) sit
//! ahead of the generic container they share a prefix with.

use serde::Serialize;
use std::fmt;

/// A recognised file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileKind {
    /// File extension without the leading dot, also used as the output subdirectory
    pub extension: &'static str,

    /// Canonical MIME type
    pub mime: &'static str,
}

#[derive(Clone, Copy)]
enum Pattern {
    /// Every `(offset, bytes)` segment must be present.
    Segments(&'static [(usize, &'static [u8])]),

    /// Formats that need more than fixed segments.
    Predicate(fn(&[u8]) -> bool),
}

/// One entry of the signature table.
#[derive(Clone, Copy)]
pub struct SignatureRule {
    kind: FileKind,
    pattern: Pattern,
}

impl fmt::Debug for SignatureRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureRule")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl SignatureRule {
    const fn segments(
        extension: &'static str,
        mime: &'static str,
        segments: &'static [(usize, &'static [u8])],
    ) -> Self {
        Self {
            kind: FileKind { extension, mime },
            pattern: Pattern::Segments(segments),
        }
    }

    const fn predicate(
        extension: &'static str,
        mime: &'static str,
        predicate: fn(&[u8]) -> bool,
    ) -> Self {
        Self {
            kind: FileKind { extension, mime },
            pattern: Pattern::Predicate(predicate),
        }
    }

    /// The file type this rule identifies.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Returns `true` if `bytes` starts with this rule's signature.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        match self.pattern {
            Pattern::Segments(segments) => segments
                .iter()
                .all(|&(offset, magic)| has_at(bytes, offset, magic)),
            Pattern::Predicate(predicate) => predicate(bytes),
        }
    }
}

fn has_at(bytes: &[u8], offset: usize, magic: &[u8]) -> bool {
    offset
        .checked_add(magic.len())
        .and_then(|end| bytes.get(offset..end))
        .is_some_and(|window| window == magic)
}

// ICO: reserved 0 and type 1, an image count of 1 to 64, and a complete first
// directory entry (bytes 6..22) whose reserved byte at offset 9 is 0.
fn is_ico(bytes: &[u8]) -> bool {
    if !has_at(bytes, 0, &[0x00, 0x00, 0x01, 0x00]) || bytes.len() < 22 {
        return false;
    }
    let count = u16::from_le_bytes([bytes[4], bytes[5]]);
    (1..=64).contains(&count) && bytes[9] == 0
}

const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];
const EBML_DOCTYPE_WINDOW: usize = 64;

fn ebml_doctype_is(bytes: &[u8], doctype: &[u8]) -> bool {
    if !has_at(bytes, 0, EBML_MAGIC) {
        return false;
    }
    let window = &bytes[..bytes.len().min(EBML_DOCTYPE_WINDOW)];
    window.windows(doctype.len()).any(|w| w == doctype)
}

fn is_webm(bytes: &[u8]) -> bool {
    ebml_doctype_is(bytes, b"webm")
}

fn is_mkv(bytes: &[u8]) -> bool {
    ebml_doctype_is(bytes, b"matroska")
}

/// The ordered signature table.
pub static SIGNATURES: &[SignatureRule] = &[
    // Images
    SignatureRule::segments("jpg", "image/jpeg", &[(0, &[0xFF, 0xD8, 0xFF])]),
    SignatureRule::segments(
        "png",
        "image/png",
        &[(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])],
    ),
    SignatureRule::segments("gif", "image/gif", &[(0, b"GIF87a")]),
    SignatureRule::segments("gif", "image/gif", &[(0, b"GIF89a")]),
    SignatureRule::segments("webp", "image/webp", &[(0, b"RIFF"), (8, b"WEBP")]),
    SignatureRule::segments("bmp", "image/bmp", &[(0, b"BM"), (6, &[0, 0, 0, 0])]),
    SignatureRule::segments("tif", "image/tiff", &[(0, &[0x49, 0x49, 0x2A, 0x00])]),
    SignatureRule::segments("tif", "image/tiff", &[(0, &[0x4D, 0x4D, 0x00, 0x2A])]),
    SignatureRule::predicate("ico", "image/vnd.microsoft.icon", is_ico),
    SignatureRule::segments("psd", "image/vnd.adobe.photoshop", &[(0, b"8BPS")]),
    SignatureRule::segments("avif", "image/avif", &[(4, b"ftypavif")]),
    SignatureRule::segments("heic", "image/heic", &[(4, b"ftypheic")]),
    SignatureRule::segments("heic", "image/heic", &[(4, b"ftypheix")]),
    SignatureRule::segments("heic", "image/heif", &[(4, b"ftypmif1")]),
    // Audio
    SignatureRule::segments("mp3", "audio/mpeg", &[(0, b"ID3")]),
    SignatureRule::segments("mp3", "audio/mpeg", &[(0, &[0xFF, 0xFB])]),
    SignatureRule::segments("mp3", "audio/mpeg", &[(0, &[0xFF, 0xF3])]),
    SignatureRule::segments("mp3", "audio/mpeg", &[(0, &[0xFF, 0xF2])]),
    SignatureRule::segments("ogg", "audio/ogg", &[(0, b"OggS")]),
    SignatureRule::segments("flac", "audio/flac", &[(0, b"fLaC")]),
    SignatureRule::segments("wav", "audio/wav", &[(0, b"RIFF"), (8, b"WAVE")]),
    SignatureRule::segments("m4a", "audio/mp4", &[(4, b"ftypM4A ")]),
    SignatureRule::segments("aac", "audio/aac", &[(0, &[0xFF, 0xF1])]),
    SignatureRule::segments("aac", "audio/aac", &[(0, &[0xFF, 0xF9])]),
    SignatureRule::segments("mid", "audio/midi", &[(0, b"MThd")]),
    SignatureRule::segments("amr", "audio/amr", &[(0, b"#!AMR")]),
    // Video
    SignatureRule::predicate("webm", "video/webm", is_webm),
    SignatureRule::predicate("mkv", "video/x-matroska", is_mkv),
    SignatureRule::segments("mov", "video/quicktime", &[(4, b"ftypqt  ")]),
    SignatureRule::segments("mp4", "video/mp4", &[(4, b"ftyp")]),
    SignatureRule::segments("avi", "video/x-msvideo", &[(0, b"RIFF"), (8, b"AVI ")]),
    SignatureRule::segments("flv", "video/x-flv", &[(0, &[0x46, 0x4C, 0x56, 0x01])]),
    SignatureRule::segments("mpg", "video/mpeg", &[(0, &[0x00, 0x00, 0x01, 0xBA])]),
    SignatureRule::segments("mpg", "video/mpeg", &[(0, &[0x00, 0x00, 0x01, 0xB3])]),
    // Documents, fonts and containers
    SignatureRule::segments("pdf", "application/pdf", &[(0, b"%PDF")]),
    SignatureRule::segments("rtf", "application/rtf", &[(0, b"{\\rtf")]),
    SignatureRule::segments("zip", "application/zip", &[(0, &[0x50, 0x4B, 0x03, 0x04])]),
    SignatureRule::segments("gz", "application/gzip", &[(0, &[0x1F, 0x8B, 0x08])]),
    SignatureRule::segments(
        "7z",
        "application/x-7z-compressed",
        &[(0, &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C])],
    ),
    SignatureRule::segments(
        "rar",
        "application/vnd.rar",
        &[(0, &[0x52, 0x61, 0x72, 0x21, 0x1A, 0x07])],
    ),
    SignatureRule::segments("wasm", "application/wasm", &[(0, &[0x00, 0x61, 0x73, 0x6D])]),
    SignatureRule::segments("woff", "font/woff", &[(0, b"wOFF")]),
    SignatureRule::segments("woff2", "font/woff2", &[(0, b"wOF2")]),
];

/// Returns the first signature that matches at the start of `bytes`.
///
/// Never panics; inputs shorter than a rule's pattern simply do not match it.
pub fn match_signature(bytes: &[u8]) -> Option<FileKind> {
    if bytes.is_empty() {
        return None;
    }
    SIGNATURES
        .iter()
        .find(|rule| rule.matches(bytes))
        .map(SignatureRule::kind)
}
