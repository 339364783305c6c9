//! Text decoding for tags and lyric files
//!
//! Old MP3 tags and `.lrc` files are frequently stored in GBK, Big5 or
//! Shift-JIS rather than UTF-8, and Windows tools often write UTF-16 with a
//! BOM. Everything read from disk goes through `decode_string`.

use encoding_rs::{BIG5, EUC_JP, EUC_KR, Encoding, GBK, SHIFT_JIS, WINDOWS_1252};

/// Decode bytes to a string, trying UTF-8 first and then legacy encodings
///
/// Order: BOM-declared encoding, UTF-8, GBK, Big5, Shift-JIS, EUC-JP,
/// EUC-KR, Windows-1252, and finally lossy UTF-8.
pub fn decode_string(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return decoded.into_owned();
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let fallbacks = [GBK, BIG5, SHIFT_JIS, EUC_JP, EUC_KR, WINDOWS_1252];
    for encoding in fallbacks {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors && is_likely_valid_text(&decoded) {
            return decoded.into_owned();
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Reject decodings full of control or private-use characters
fn is_likely_valid_text(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }

    let suspicious = s
        .chars()
        .filter(|&c| {
            (c < ' ' && !matches!(c, '\t' | '\n' | '\r'))
                || ('\u{E000}'..='\u{F8FF}').contains(&c)
                || c == '\u{FFFD}'
        })
        .count();

    // Allow up to 5%
    suspicious <= (s.len() / 20).max(1)
}

/// Collapse runs of whitespace and trim
pub fn normalize_string(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
