//! POSIX shell quoting.

/// Quote a string for safe use as one word in a POSIX shell command line.
///
/// Strings consisting only of unproblematic characters are returned as-is;
/// everything else is wrapped in single quotes, with embedded single quotes
/// escaped via the `'"'"'` dance. The empty string renders as `''`.
#[must_use]
pub fn quote(text: &str) -> String {
    if text.is_empty() {
        return "''".to_string();
    }
    if text.bytes().all(is_safe) {
        return text.to_string();
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            quoted.push_str("'\"'\"'");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn is_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'_' | b'@' | b'%' | b'+' | b'=' | b':' | b',' | b'.' | b'/' | b'-'
        )
}
