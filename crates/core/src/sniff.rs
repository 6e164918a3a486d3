//! Content-type sniffing for job outputs.
//!
//! Implements the WHATWG MIME sniffing table (the same one Go's
//! `http.DetectContentType` uses): look at no more than [`SNIFF_LEN`] bytes,
//! walk an ordered list of signatures and return the first match, falling
//! back to `application/octet-stream`.

/// Maximum number of leading bytes considered.
pub const SNIFF_LEN: usize = 512;

/// Returned when nothing in the table matches.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TEXT_UTF8: &str = "text/plain; charset=utf-8";
const HTML_UTF8: &str = "text/html; charset=utf-8";

enum Signature {
    /// Case-insensitive HTML tag, whitespace-skipping, followed by a
    /// space or `>`.
    Html(&'static [u8]),
    /// `data[i] & mask[i] == pat[i]` for every byte of the pattern.
    Masked {
        mask: &'static [u8],
        pat: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    /// Plain prefix match.
    Exact {
        sig: &'static [u8],
        content_type: &'static str,
    },
    /// ISO base media `ftyp` box with an `mp4` brand.
    Mp4,
    /// No binary control bytes after leading whitespace.
    Text,
}

const fn exact(sig: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Exact { sig, content_type }
}

const fn masked(mask: &'static [u8], pat: &'static [u8], content_type: &'static str) -> Signature {
    Signature::Masked {
        mask,
        pat,
        skip_ws: false,
        content_type,
    }
}

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pat: b"<?xml",
        skip_ws: true,
        content_type: "text/xml; charset=utf-8",
    },
    exact(b"%PDF-", "application/pdf"),
    exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks.
    masked(b"\xFF\xFF\x00\x00", b"\xFE\xFF\x00\x00", "text/plain; charset=utf-16be"),
    masked(b"\xFF\xFF\x00\x00", b"\xFF\xFE\x00\x00", "text/plain; charset=utf-16le"),
    masked(b"\xFF\xFF\xFF\x00", b"\xEF\xBB\xBF\x00", TEXT_UTF8),
    // Images.
    exact(b"\x00\x00\x01\x00", "image/x-icon"),
    exact(b"\x00\x00\x02\x00", "image/x-icon"),
    exact(b"BM", "image/bmp"),
    exact(b"GIF87a", "image/gif"),
    exact(b"GIF89a", "image/gif"),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WEBPVP",
        "image/webp",
    ),
    exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Audio and video.
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"FORM\x00\x00\x00\x00AIFF",
        "audio/aiff",
    ),
    masked(b"\xFF\xFF\xFF", b"ID3", "audio/mpeg"),
    masked(b"\xFF\xFF\xFF\xFF\xFF", b"OggS\x00", "application/ogg"),
    masked(
        b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF",
        b"MThd\x00\x00\x00\x06",
        "audio/midi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00AVI ",
        "video/avi",
    ),
    masked(
        b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        b"RIFF\x00\x00\x00\x00WAVE",
        "audio/wave",
    ),
    Signature::Mp4,
    exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts.
    masked(
        b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xFF\xFF",
        b"\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00LP",
        "application/vnd.ms-fontobject",
    ),
    exact(b"\x00\x01\x00\x00", "font/ttf"),
    exact(b"OTTO", "font/otf"),
    exact(b"ttcf", "font/collection"),
    exact(b"wOFF", "font/woff"),
    exact(b"wOF2", "font/woff2"),
    // Archives.
    exact(b"\x1F\x8B\x08", "application/x-gzip"),
    exact(b"PK\x03\x04", "application/zip"),
    exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    exact(b"\x00\x61\x73\x6D", "application/wasm"),
    Signature::Text,
];

/// Sniff the content type of `data` from its leading bytes.
///
/// Always returns a valid MIME type; the result depends only on the first
/// [`SNIFF_LEN`] bytes.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|&b| !is_ws(b))
        .unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data, first_non_ws))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Html(tag) => match_html(tag, &data[first_non_ws..]),
            Signature::Masked {
                mask,
                pat,
                skip_ws,
                content_type,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                match_masked(mask, pat, data).then_some(*content_type)
            }
            Signature::Exact { sig, content_type } => {
                data.starts_with(sig).then_some(*content_type)
            }
            Signature::Mp4 => match_mp4(data).then_some("video/mp4"),
            Signature::Text => {
                (!data[first_non_ws..].iter().any(|&b| is_binary(b))).then_some(TEXT_UTF8)
            }
        }
    }
}

fn match_html(tag: &[u8], data: &[u8]) -> Option<&'static str> {
    if data.len() < tag.len() + 1 {
        return None;
    }
    for (&t, &d) in tag.iter().zip(data) {
        let d = if t.is_ascii_uppercase() { d & 0xDF } else { d };
        if t != d {
            return None;
        }
    }
    matches!(data[tag.len()], b' ' | b'>').then_some(HTML_UTF8)
}

fn match_masked(mask: &[u8], pat: &[u8], data: &[u8]) -> bool {
    if mask.len() != pat.len() || data.len() < pat.len() {
        return false;
    }
    pat.iter()
        .zip(mask)
        .zip(data)
        .all(|((&p, &m), &d)| d & m == p)
}

fn match_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Major brand at 8, minor version at 12 (skipped), compatible brands after.
    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12)
        .any(|st| data.get(st..st + 3) == Some(b"mp4".as_slice()))
}

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
