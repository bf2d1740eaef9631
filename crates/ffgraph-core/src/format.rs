//! Text formatting helpers shared by the renderers and the command assembler.

use std::borrow::Cow;
use std::time::Duration;

/// Formats a duration as zero-padded `HH:MM:SS`, rounded to the nearest second.
///
/// Half seconds round up. Hours are not wrapped, so 100 hours prints as
/// `100:00:00`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ffgraph_core::format::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(3_723_500)), "01:02:04");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() >= 500_000_000 {
        secs = secs.saturating_add(1);
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Escapes free-form text for use as a filter option value and wraps it in
/// single quotes.
///
/// Backslash, double quote, percent and colon are backslash-escaped; a single
/// quote closes the quoted section, emits an escaped quote and reopens it.
///
/// ```rust
/// use ffgraph_core::format::escape_text;
///
/// assert_eq!(escape_text("12:30"), r"'12\:30'");
/// assert_eq!(escape_text("it's"), r"'it'\\\''s'");
/// ```
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str(r"'\\\''"),
            '%' => out.push_str(r"\%"),
            ':' => out.push_str(r"\:"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Quotes a token for display in a POSIX shell.
///
/// Tokens made only of unreserved characters are returned unchanged.
pub fn shell_quote(token: &str) -> Cow<'_, str> {
    let safe = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_-./:=,+@%".contains(&b));
    if safe {
        Cow::Borrowed(token)
    } else {
        Cow::Owned(format!("'{}'", token.replace('\'', r"'\''")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_pads() {
        assert_eq!(format_duration(Duration::from_secs(5)), "00:00:05");
        assert_eq!(format_duration(Duration::from_secs(3600 + 60 + 1)), "01:01:01");
    }

    #[test]
    fn test_format_duration_rounds() {
        assert_eq!(format_duration(Duration::from_millis(1499)), "00:00:01");
        assert_eq!(format_duration(Duration::from_millis(1500)), "00:00:02");
        assert_eq!(format_duration(Duration::from_millis(59_600)), "00:01:00");
    }

    #[test]
    fn test_format_duration_large_hours() {
        assert_eq!(format_duration(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_format_duration_max_saturates() {
        assert_eq!(format_duration(Duration::MAX), "5124095576030431:00:15");
    }

    #[test]
    fn test_escape_text_specials() {
        assert_eq!(escape_text("plain"), "'plain'");
        assert_eq!(escape_text("50%"), r"'50\%'");
        assert_eq!(escape_text(r"a\b"), r"'a\\b'");
        assert_eq!(escape_text("say \"hi\""), "'say \\\"hi\\\"'");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("out.mp4"), "out.mp4");
        assert_eq!(shell_quote("[0:0]scale=1:1;[v1]"), "'[0:0]scale=1:1;[v1]'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
