//! Escaping for free-form text such as comments, so it fits on one
//! option line.
//!
//! Control characters, `:`, `%` and every non-ASCII byte are written as
//! `%XX` (UTF-8 bytes, upper-case hex).

/// Escapes `text` for storage in a single option value.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_control() || !byte.is_ascii() || byte == b':' || byte == b'%' {
            out.push('%');
            out.push_str(&hex::encode_upper([byte]));
        } else {
            out.push(char::from(byte));
        }
    }
    out
}

/// Reverses [`encode_text`]. Malformed escapes are kept as they are and
/// invalid UTF-8 is replaced.
pub fn decode_text(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(decoded) = bytes.get(i + 1..i + 3).and_then(|pair| hex::decode(pair).ok()) {
                out.extend_from_slice(&decoded);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
