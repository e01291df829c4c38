//! Accessors and mutators over raw HTTP/1.x request bytes.
//!
//! Requests are never parsed into an object model. Each function scans only
//! as far as it needs to: the request line for the method and path, the
//! header block (up to the first empty line) for headers. The body is opaque.
//!
//! Malformed input never panics. Lookups report the piece as absent and
//! mutations leave the payload untouched.

use memchr::{memchr, memmem};
use std::ops::Range;

const CRLF: &[u8] = b"\r\n";

/// Offset of the CRLF that terminates the request line, or the payload
/// length if there is none.
fn request_line_end(payload: &[u8]) -> usize {
    memmem::find(payload, CRLF).unwrap_or(payload.len())
}

fn method_range(payload: &[u8]) -> Option<Range<usize>> {
    let line = &payload[..request_line_end(payload)];
    let sp = memchr(b' ', line)?;
    Some(0..sp)
}

fn path_range(payload: &[u8]) -> Option<Range<usize>> {
    let line_end = request_line_end(payload);
    let line = &payload[..line_end];
    let start = memchr(b' ', line)? + 1;
    let end = memchr(b' ', &line[start..])
        .map(|i| start + i)
        .unwrap_or(line_end);
    Some(start..end)
}

/// Byte range of a header's value with surrounding spaces and tabs trimmed.
fn header_value_range(payload: &[u8], name: &[u8]) -> Option<Range<usize>> {
    let mut pos = request_line_end(payload);
    if pos == payload.len() {
        return None;
    }
    pos += CRLF.len();

    loop {
        let rest = &payload[pos..];
        let line_len = memmem::find(rest, CRLF).unwrap_or(rest.len());
        if line_len == 0 {
            // Empty line: end of the header block
            return None;
        }

        let line = &rest[..line_len];
        if let Some(colon) = memchr(b':', line) {
            if line[..colon].eq_ignore_ascii_case(name) {
                let mut start = colon + 1;
                while start < line_len && is_blank(line[start]) {
                    start += 1;
                }
                let mut end = line_len;
                while end > start && is_blank(line[end - 1]) {
                    end -= 1;
                }
                return Some(pos + start..pos + end);
            }
        }

        if line_len == rest.len() {
            return None;
        }
        pos += line_len + CRLF.len();
    }
}

#[inline]
fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Location of a query parameter inside the payload.
struct ParamSpan {
    /// End of the parameter name
    key_end: usize,
    /// Value range, `None` for a bare `name` without `=`
    value: Option<Range<usize>>,
}

fn find_param(payload: &[u8], name: &[u8]) -> Option<ParamSpan> {
    let path = path_range(payload)?;
    let mut pos = path.start + memchr(b'?', &payload[path.clone()])? + 1;

    while pos <= path.end {
        let seg_end = memchr(b'&', &payload[pos..path.end])
            .map(|i| pos + i)
            .unwrap_or(path.end);
        let segment = &payload[pos..seg_end];

        let (key_end, value) = match memchr(b'=', segment) {
            Some(i) => (pos + i, Some(pos + i + 1..seg_end)),
            None => (seg_end, None),
        };

        if &payload[pos..key_end] == name {
            return Some(ParamSpan { key_end, value });
        }
        pos = seg_end + 1;
    }

    None
}

/// Request method, or an empty slice if the request line has no space.
pub fn method(payload: &[u8]) -> &[u8] {
    method_range(payload)
        .map(|r| &payload[r])
        .unwrap_or_default()
}

/// Request target (path and query string).
pub fn path(payload: &[u8]) -> &[u8] {
    path_range(payload)
        .map(|r| &payload[r])
        .unwrap_or_default()
}

/// Replace the request target.
pub fn set_path(payload: &mut Vec<u8>, new_path: &[u8]) {
    if let Some(range) = path_range(payload) {
        payload.splice(range, new_path.iter().copied());
    }
}

/// Value of the first header named `name` (ASCII case-insensitive).
pub fn header<'a>(payload: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    header_value_range(payload, name).map(|r| &payload[r])
}

/// Set a header value in place, or insert the header right after the
/// request line if it does not exist yet.
pub fn set_header(payload: &mut Vec<u8>, name: &[u8], value: &[u8]) {
    if let Some(range) = header_value_range(payload, name) {
        payload.splice(range, value.iter().copied());
        return;
    }

    let line_end = request_line_end(payload);
    if line_end == payload.len() {
        return;
    }

    let at = line_end + CRLF.len();
    let mut line = Vec::with_capacity(name.len() + value.len() + 4);
    line.extend_from_slice(name);
    line.extend_from_slice(b": ");
    line.extend_from_slice(value);
    line.extend_from_slice(CRLF);
    payload.splice(at..at, line);
}

/// Raw (undecoded) value of the first query parameter named `name`.
///
/// A bare `name` without `=` yields an empty value.
pub fn param<'a>(payload: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let span = find_param(payload, name)?;
    Some(match span.value {
        Some(r) => &payload[r],
        None => &payload[span.key_end..span.key_end],
    })
}

/// Set the value of a query parameter, appending it if it is missing.
///
/// `name` and `value` are inserted verbatim and must already be encoded.
pub fn set_param(payload: &mut Vec<u8>, name: &[u8], value: &[u8]) {
    if let Some(span) = find_param(payload, name) {
        match span.value {
            Some(range) => {
                payload.splice(range, value.iter().copied());
            }
            None => {
                let mut assignment = Vec::with_capacity(value.len() + 1);
                assignment.push(b'=');
                assignment.extend_from_slice(value);
                payload.splice(span.key_end..span.key_end, assignment);
            }
        }
        return;
    }

    let Some(range) = path_range(payload) else {
        return;
    };

    let target = &payload[range.clone()];
    let separator: &[u8] = match memchr(b'?', target) {
        None => b"?",
        Some(q) if q + 1 == target.len() || target.ends_with(b"&") => b"",
        Some(_) => b"&",
    };

    let mut pair = Vec::with_capacity(separator.len() + name.len() + value.len() + 1);
    pair.extend_from_slice(separator);
    pair.extend_from_slice(name);
    pair.push(b'=');
    pair.extend_from_slice(value);
    payload.splice(range.end..range.end, pair);
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] =
        b"POST /post?user_id=3&flag HTTP/1.1\r\nContent-Length: 7\r\nHost:  www.w3.org \r\n\r\na=1&b=2";

    #[test]
    fn test_method_and_path() {
        assert_eq!(method(REQUEST), b"POST");
        assert_eq!(path(REQUEST), b"/post?user_id=3&flag");
    }

    #[test]
    fn test_path_without_version() {
        assert_eq!(path(b"GET /only\r\n\r\n"), b"/only");
    }

    #[test]
    fn test_set_path() {
        let mut payload = REQUEST.to_vec();
        set_path(&mut payload, b"/v2");
        assert!(payload.starts_with(b"POST /v2 HTTP/1.1\r\n"));
        assert!(payload.ends_with(b"\r\n\r\na=1&b=2"));
    }

    #[test]
    fn test_header_lookup() {
        assert_eq!(header(REQUEST, b"Host"), Some(&b"www.w3.org"[..]));
        assert_eq!(header(REQUEST, b"content-length"), Some(&b"7"[..]));
        assert_eq!(header(REQUEST, b"Missing"), None);
    }

    #[test]
    fn test_header_not_read_from_body() {
        let payload = b"GET / HTTP/1.1\r\nHost: a\r\n\r\nX-Body: leaked\r\n";
        assert_eq!(header(payload, b"X-Body"), None);
    }

    #[test]
    fn test_header_in_truncated_capture() {
        let payload = b"GET / HTTP/1.1\r\nHost: a\r\nX-Last: tail";
        assert_eq!(header(payload, b"X-Last"), Some(&b"tail"[..]));
    }

    #[test]
    fn test_set_header_in_place() {
        let mut payload = REQUEST.to_vec();
        set_header(&mut payload, b"host", b"localhost");
        assert_eq!(
            payload,
            b"POST /post?user_id=3&flag HTTP/1.1\r\nContent-Length: 7\r\nHost:  localhost \r\n\r\na=1&b=2"
        );
    }

    #[test]
    fn test_set_header_inserts_after_request_line() {
        let mut payload = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n".to_vec();
        set_header(&mut payload, b"X-New", b"1");
        assert_eq!(payload, b"GET / HTTP/1.1\r\nX-New: 1\r\nHost: a\r\n\r\n");
    }

    #[test]
    fn test_param_lookup() {
        assert_eq!(param(REQUEST, b"user_id"), Some(&b"3"[..]));
        assert_eq!(param(REQUEST, b"flag"), Some(&b""[..]));
        assert_eq!(param(REQUEST, b"user"), None);
        assert_eq!(param(b"GET /no-query HTTP/1.1\r\n\r\n", b"user_id"), None);
    }

    #[test]
    fn test_set_param_replaces_value() {
        let mut payload = REQUEST.to_vec();
        set_param(&mut payload, b"user_id", b"42");
        assert_eq!(path(&payload), b"/post?user_id=42&flag");
    }

    #[test]
    fn test_set_param_bare_key() {
        let mut payload = REQUEST.to_vec();
        set_param(&mut payload, b"flag", b"on");
        assert_eq!(path(&payload), b"/post?user_id=3&flag=on");
    }

    #[test]
    fn test_set_param_appends() {
        let mut payload = b"GET /a HTTP/1.1\r\n\r\n".to_vec();
        set_param(&mut payload, b"debug", b"0");
        assert_eq!(path(&payload), b"/a?debug=0");

        set_param(&mut payload, b"page", b"2");
        assert_eq!(path(&payload), b"/a?debug=0&page=2");

        let mut payload = b"GET /a? HTTP/1.1\r\n\r\n".to_vec();
        set_param(&mut payload, b"debug", b"0");
        assert_eq!(path(&payload), b"/a?debug=0");
    }

    #[test]
    fn test_malformed_payloads() {
        for payload in [&b""[..], b"garbage", b"\r\n\r\n", b"GET", b"GET\r\nHost: a\r\n\r\n"] {
            assert_eq!(method(payload), b"");
            assert_eq!(path(payload), b"");
            assert_eq!(param(payload, b"id"), None);

            let mut owned = payload.to_vec();
            set_path(&mut owned, b"/x");
            set_param(&mut owned, b"id", b"1");
            assert_eq!(path(&owned), b"");
        }

        assert_eq!(header(b"GET\r\nHost: a\r\n\r\n", b"Host"), Some(&b"a"[..]));

        let mut no_crlf = b"GET / HTTP/1.1".to_vec();
        set_header(&mut no_crlf, b"X-A", b"1");
        assert_eq!(no_crlf, b"GET / HTTP/1.1");
    }
}
