//! Access-log line extraction.
//!
//! Lines follow the common/combined log format:
//!
//! ```text
//! host ident user [time] "METHOD URL PROTO" status bytes "referer" "agent"
//! ```
//!
//! Only the request URL, the byte count and the referer are extracted. Any
//! line that does not have those three fields in that shape is reported as
//! unparseable and skipped by the caller.

use std::borrow::Cow;

use memchr::{memchr, memmem};
use percent_encoding::percent_decode;

/// Referer key used for requests that carried no referer (`"-"`).
pub const NO_REFERER: &[u8] = b"(no referer)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub url: Cow<'a, [u8]>,
    pub referer: Cow<'a, [u8]>,
    pub bytes: i64,
}

/// Turns one raw log line into a [`Record`].
///
/// `None` means the line is unparseable.
pub trait LineExtractor {
    fn extract<'a>(&self, line: &'a [u8]) -> Option<Record<'a>>;
}

/// Extractor for the common/combined access-log format.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedLogFormat;

impl LineExtractor for CombinedLogFormat {
    fn extract<'a>(&self, line: &'a [u8]) -> Option<Record<'a>> {
        let url = request_url(line)?;
        let (bytes, after_bytes) = byte_count(line)?;
        let referer = referer(after_bytes)?;

        let referer = if referer == b"-" {
            Cow::Borrowed(NO_REFERER)
        } else {
            url_decode(referer)
        };

        Some(Record {
            url: url_decode(url),
            referer,
            bytes,
        })
    }
}

/// Splits at the first space: `(token, rest after the space)`.
#[inline]
fn split_token(s: &[u8]) -> Option<(&[u8], &[u8])> {
    let sp = memchr(b' ', s)?;
    Some((&s[..sp], &s[sp + 1..]))
}

/// Second token of the quoted request field.
fn request_url(line: &[u8]) -> Option<&[u8]> {
    let open = memchr(b'"', line)?;
    let (_method, rest) = split_token(&line[open + 1..])?;
    let (url, _) = split_token(rest)?;
    Some(url)
}

/// The byte count following the status code after the closing quote of the
/// request field, and the remainder of the line after it.
fn byte_count(line: &[u8]) -> Option<(i64, &[u8])> {
    let close = memmem::find(line, b"\" ")?;
    let (_status, rest) = split_token(&line[close + 2..])?;
    let (token, rest) = split_token(rest)?;

    if token.first() == Some(&b'-') {
        return Some((0, rest));
    }
    Some((parse_leading_digits(token)?, rest))
}

fn referer(after_bytes: &[u8]) -> Option<&[u8]> {
    let quoted = after_bytes.strip_prefix(b"\"")?;
    let end = memchr(b'"', quoted)?;
    Some(&quoted[..end])
}

/// Leading ASCII digits as `i64`. `None` when there are none or the value
/// overflows.
fn parse_leading_digits(token: &[u8]) -> Option<i64> {
    let digits = token.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    token[..digits].iter().try_fold(0i64, |acc, &b| {
        acc.checked_mul(10)?.checked_add((b - b'0') as i64)
    })
}

/// `%XX` becomes the byte `0xXX` and `+` becomes a space. Malformed escapes
/// are kept verbatim.
pub fn url_decode(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'+', input).is_none() {
        return percent_decode(input).into();
    }
    // `+` is replaced before escapes are decoded so that `%2B` stays a plus.
    let spaced: Vec<u8> = input
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    Cow::Owned(percent_decode(&spaced).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINE: &[u8] = br#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08""#;

    fn extract(line: &[u8]) -> Option<Record<'_>> {
        CombinedLogFormat.extract(line)
    }

    #[test]
    fn extracts_combined_log_line() {
        let rec = extract(LINE).unwrap();
        assert_eq!(&*rec.url, b"/apache_pb.gif");
        assert_eq!(&*rec.referer, b"http://www.example.com/start.html");
        assert_eq!(rec.bytes, 2326);
    }

    #[test]
    fn dash_bytes_count_as_zero() {
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1" 304 - "-" "-""#;
        let rec = extract(line).unwrap();
        assert_eq!(rec.bytes, 0);
    }

    #[test]
    fn dash_referer_maps_to_placeholder() {
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1" 200 150 "-" "-""#;
        let rec = extract(line).unwrap();
        assert_eq!(&*rec.referer, NO_REFERER);
        assert_eq!(&*rec.url, b"/x");
        assert_eq!(rec.bytes, 150);
    }

    #[test]
    fn url_and_referer_are_percent_decoded() {
        let line = br#"h - - [t] "GET /search?q=a+b%2Bc%20d HTTP/1.1" 200 10 "http://ex.com/?from=%E2%9C%93" "-""#;
        let rec = extract(line).unwrap();
        assert_eq!(&*rec.url, b"/search?q=a b+c d");
        assert_eq!(&*rec.referer, "http://ex.com/?from=\u{2713}".as_bytes());
    }

    #[test]
    fn missing_closing_quote_is_unparseable() {
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1 200 150"#;
        assert_eq!(extract(line), None);
    }

    #[test]
    fn missing_closing_quote_with_quoted_trailer_is_unparseable() {
        // The first `" ` found belongs to the referer, leaving no status and
        // byte count behind it.
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1 200 150 "-" "-""#;
        assert_eq!(extract(line), None);
    }

    #[test]
    fn non_numeric_bytes_are_unparseable() {
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1" 200 abc "-" "-""#;
        assert_eq!(extract(line), None);
    }

    #[test]
    fn missing_url_is_unparseable() {
        assert_eq!(extract(br#"1.1.1.1 - - [t] "GET/x"#), None);
        assert_eq!(extract(b"no quotes at all 200 1"), None);
        assert_eq!(extract(b""), None);
    }

    #[test]
    fn missing_referer_is_unparseable() {
        let line = br#"1.1.1.1 - - [t] "GET /x HTTP/1.1" 200 150 "#;
        assert_eq!(extract(line), None);
    }

    #[test]
    fn overflowing_byte_count_is_unparseable() {
        let line = br#"h - - [t] "GET /x HTTP/1.1" 200 99999999999999999999 "-" "-""#;
        assert_eq!(extract(line), None);
    }

    #[test]
    fn decode_borrows_when_nothing_to_decode() {
        assert!(matches!(url_decode(b"/plain/path"), Cow::Borrowed(_)));
    }

    #[test]
    fn decode_keeps_malformed_escapes() {
        assert_eq!(&*url_decode(b"/100%"), b"/100%");
        assert_eq!(&*url_decode(b"/a%zzb"), b"/a%zzb");
        assert_eq!(&*url_decode(b"/a%4"), b"/a%4");
        assert_eq!(&*url_decode(b"/%41"), b"/A");
    }
}
