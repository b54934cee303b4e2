// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Body normalization and title extraction.
//!
//! Responses from older CN/JP/KR/Eastern-European sites are frequently served in a
//! legacy charset without a usable `Content-Type` hint. Bodies are normalized to UTF-8
//! by trying a fixed list of legacy decoders in priority order.

use encoding_rs::{
    Encoding, BIG5, EUC_JP, EUC_KR, GB18030, GBK, ISO_8859_2, SHIFT_JIS, WINDOWS_1251,
    WINDOWS_1252,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Legacy decoders, in the order they are tried
const LEGACY_ENCODINGS: &[&Encoding] = &[
    GB18030,
    GBK,
    BIG5,
    EUC_JP,
    SHIFT_JIS,
    EUC_KR,
    // ISO-8859-1 is an alias of windows-1252 in the WHATWG registry
    WINDOWS_1252,
    ISO_8859_2,
    WINDOWS_1251,
];

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("title pattern is valid")
});

/// Decode a body to UTF-8 text.
///
/// Valid UTF-8 is returned as-is. Otherwise the first legacy encoding that decodes
/// without malformed sequences wins. If none does, the bytes are passed through lossily
/// (the untouched bytes stay available as the raw body).
pub fn normalize_body(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }

    if let Ok(text) = std::str::from_utf8(raw) {
        return text.to_string();
    }

    decode_legacy(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned())
}

fn decode_legacy(raw: &[u8]) -> Option<Cow<'_, str>> {
    LEGACY_ENCODINGS
        .iter()
        .find_map(|enc| enc.decode_without_bom_handling_and_without_replacement(raw))
}

/// Case-insensitive `<title>` extraction. Missing title yields an empty string.
pub fn extract_title(body: &str) -> String {
    TITLE_RE
        .captures(body)
        .and_then(|cap| cap.get(1))
        .map(|m| {
            m.as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}
