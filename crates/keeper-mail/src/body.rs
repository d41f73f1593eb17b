//! Message body decoding and code extraction.

use std::sync::LazyLock;

use mailparse::ParsedMail;
use regex::Regex;

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{6}\b").unwrap());

/// First standalone six-digit token in `text`.
pub fn extract_code(text: &str) -> Option<&str> {
    CODE_PATTERN.find(text).map(|m| m.as_str())
}

/// Readable text of a raw RFC 822 message.
///
/// Multipart messages yield their first `text/plain` part, falling back to
/// the first `text/*` part. Single-part messages yield their decoded body.
/// Anything that fails to parse is read as lossy UTF-8.
pub fn message_text(raw: &[u8]) -> String {
    let Ok(parsed) = mailparse::parse_mail(raw) else {
        return String::from_utf8_lossy(raw).into_owned();
    };
    if parsed.subparts.is_empty() {
        return parsed
            .get_body()
            .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned());
    }
    find_part(&parsed, |m| m == "text/plain")
        .or_else(|| find_part(&parsed, |m| m.starts_with("text/")))
        .unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned())
}

/// Depth-first search for the first leaf whose mimetype satisfies `want`.
fn find_part(mail: &ParsedMail<'_>, want: impl Fn(&str) -> bool + Copy) -> Option<String> {
    if mail.subparts.is_empty() {
        if want(&mail.ctype.mimetype) {
            return mail.get_body().ok();
        }
        return None;
    }
    mail.subparts.iter().find_map(|part| find_part(part, want))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTIPART: &str = "From: Pella <noreply@pella.app>\r\n\
Subject: Your login code\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Your code is <b>999999</b></p>\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Your code is 482913. It expires in 10 minutes.\r\n\
--b1--\r\n";

    #[test]
    fn finds_six_digit_token() {
        assert_eq!(extract_code("code: 123456 thanks"), Some("123456"));
    }

    #[test]
    fn ignores_longer_digit_runs() {
        assert_eq!(extract_code("order 1234567 placed"), None);
        assert_eq!(extract_code("order 1234567, code 654321"), Some("654321"));
    }

    #[test]
    fn no_token_in_text() {
        assert_eq!(extract_code("welcome aboard"), None);
    }

    #[test]
    fn multipart_prefers_plain_text() {
        let text = message_text(MULTIPART.as_bytes());
        assert!(text.contains("482913"));
        assert!(!text.contains("999999"));
    }

    #[test]
    fn multipart_without_plain_uses_first_text_part() {
        let raw = "Content-Type: multipart/alternative; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: image/png\r\n\
\r\n\
AAAA\r\n\
--b\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>111222</p>\r\n\
--b--\r\n";
        assert_eq!(extract_code(&message_text(raw.as_bytes())), Some("111222"));
    }

    #[test]
    fn single_part_body_is_decoded() {
        let raw = "Subject: hi\r\nContent-Type: text/plain\r\n\r\nuse 246810 to sign in\r\n";
        assert_eq!(extract_code(&message_text(raw.as_bytes())), Some("246810"));
    }
}
