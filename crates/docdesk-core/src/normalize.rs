//! Legacy text normalization applied to every loaded string.
//!
//! On Windows the application historically wrote logs and terminal output
//! through the CP932 code page, and characters outside it crashed the
//! process. [`TextNormalization::LegacyCp932`] reproduces the workaround:
//! NFC-normalize, then round-trip through CP932 and silently drop every
//! character that has no CP932 representation.
//!
//! **This is lossy.** Accented Latin letters, emoji and most non-Japanese
//! scripts disappear from the indexed text. It is kept exactly as-is for
//! compatibility with existing corpora and is disabled everywhere except
//! Windows unless `ingest.legacy_cp932` says otherwise.
//!
//! encoding_rs implements the WHATWG `Shift_JIS` encoding. It decodes the
//! same byte table as CP932 but encodes a few code points differently, so
//! those are fixed up before encoding:
//!
//! - `¥` and `‾` have no CP932 encoding (WHATWG folds them onto `\` and `~`).
//! - CP932 encodes some JIS X 0208 code points through their Windows
//!   equivalent, e.g. `〜` (U+301C) comes back as `～` (U+FF5E).
//! - The user-defined area (U+E000..U+E757) and U+F8F0..U+F8F3 round-trip
//!   unchanged in CP932 but are unmappable in WHATWG.

use encoding_rs::{EncoderResult, SHIFT_JIS};
use unicode_normalization::UnicodeNormalization;

use crate::models::Document;

/// How loaded strings are normalized before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextNormalization {
    /// Strings pass through unchanged.
    Passthrough,
    /// NFC, then drop every character CP932 cannot represent.
    LegacyCp932,
}

impl TextNormalization {
    /// `LegacyCp932` on Windows, `Passthrough` elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            TextNormalization::LegacyCp932
        } else {
            TextNormalization::Passthrough
        }
    }

    /// Resolve an optional configuration override against the platform default.
    pub fn from_override(legacy_cp932: Option<bool>) -> Self {
        match legacy_cp932 {
            Some(true) => TextNormalization::LegacyCp932,
            Some(false) => TextNormalization::Passthrough,
            None => Self::platform_default(),
        }
    }

    pub fn is_lossy(self) -> bool {
        self == TextNormalization::LegacyCp932
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            TextNormalization::Passthrough => text.to_string(),
            TextNormalization::LegacyCp932 => {
                let composed: String = text.nfc().collect();
                drop_unmappable_cp932(&composed)
            }
        }
    }

    /// Normalize the content and every metadata string of a document.
    pub fn apply_document(self, doc: Document) -> Document {
        if self == TextNormalization::Passthrough {
            return doc;
        }
        let mut metadata = doc.metadata;
        metadata.source = self.apply(&metadata.source);
        metadata.title = metadata.title.map(|t| self.apply(&t));
        Document {
            content: self.apply(&doc.content),
            metadata,
        }
    }
}

/// Code points CP932 encodes through a different character of the same
/// JIS X 0208 cell.
fn cp932_best_fit(c: char) -> char {
    match c {
        '\u{301C}' => '\u{FF5E}',
        '\u{2016}' => '\u{2225}',
        '\u{2212}' => '\u{FF0D}',
        '\u{00A2}' => '\u{FFE0}',
        '\u{00A3}' => '\u{FFE1}',
        '\u{00AC}' => '\u{FFE2}',
        other => other,
    }
}

fn cp932_unencodable(c: char) -> bool {
    matches!(c, '\u{00A5}' | '\u{203E}')
}

fn cp932_private_use(c: char) -> bool {
    matches!(c, '\u{E000}'..='\u{E757}' | '\u{F8F0}'..='\u{F8F3}')
}

fn drop_unmappable_cp932(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    for c in text.chars() {
        if cp932_private_use(c) {
            out.push_str(&round_trip_shift_jis(&pending));
            pending.clear();
            out.push(c);
        } else if !cp932_unencodable(c) {
            pending.push(cp932_best_fit(c));
        }
    }
    out.push_str(&round_trip_shift_jis(&pending));
    out
}

fn round_trip_shift_jis(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut encoder = SHIFT_JIS.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len() * 2 + 16);
    let mut bytes = vec![0u8; capacity];
    let mut written_total = 0;
    let mut remaining = text;

    loop {
        let (result, read, written) = encoder.encode_from_utf8_without_replacement(
            remaining,
            &mut bytes[written_total..],
            true,
        );
        written_total += written;
        remaining = &remaining[read..];
        match result {
            EncoderResult::InputEmpty => break,
            // The unmappable character has already been consumed.
            EncoderResult::Unmappable(_) => continue,
            EncoderResult::OutputFull => {
                let grow = remaining.len() * 2 + 16;
                bytes.resize(bytes.len() + grow, 0);
            }
        }
    }

    bytes.truncate(written_total);
    let (decoded, _) = SHIFT_JIS.decode_without_bom_handling(&bytes);
    decoded.into_owned()
}
