pub mod auth;
pub mod cron_secret;

use actix_web::HttpRequest;
use std::borrow::Cow;

pub struct ExtractedToken<'a> {
    pub value: Cow<'a, str>,
    pub from_cookie: bool,
}

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>>;
}

pub struct FromHeader {}
pub struct FromHeaderOrCookie {}

impl TokenLocation for FromHeader {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>> {
        let header = req.headers().get(key)?;

        Some(ExtractedToken {
            value: Cow::Borrowed(header.to_str().ok()?),
            from_cookie: false,
        })
    }
}

impl TokenLocation for FromHeaderOrCookie {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<ExtractedToken<'a>> {
        if let Some(extracted) = FromHeader::get_from_request(req, key) {
            return Some(extracted);
        }

        let cookie = req.cookie(key)?;

        Some(ExtractedToken {
            value: Cow::Owned(String::from(cookie.value())),
            from_cookie: true,
        })
    }
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() || provided.is_empty() {
        return false;
    }

    let mut bytes_dont_match = 0u8;
    for (a, b) in provided.iter().zip(expected.iter()) {
        bytes_dont_match |= a ^ b;
    }

    bytes_dont_match == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[test]
    fn test_header_takes_precedence_over_cookie() {
        let req = TestRequest::default()
            .insert_header(("SessionToken", "from-header"))
            .cookie(Cookie::new("SessionToken", "from-cookie"))
            .to_http_request();

        let extracted = FromHeaderOrCookie::get_from_request(&req, "SessionToken").unwrap();
        assert_eq!(extracted.value, "from-header");
        assert!(!extracted.from_cookie);
    }

    #[test]
    fn test_cookie_used_without_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new("SessionToken", "from-cookie"))
            .to_http_request();

        let extracted = FromHeaderOrCookie::get_from_request(&req, "SessionToken").unwrap();
        assert_eq!(extracted.value, "from-cookie");
        assert!(extracted.from_cookie);

        assert!(FromHeader::get_from_request(&req, "SessionToken").is_none());
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match(b"abc123", b"abc123"));
        assert!(!secrets_match(b"abc124", b"abc123"));
        assert!(!secrets_match(b"abc12", b"abc123"));
        assert!(!secrets_match(b"", b""));
    }
}
