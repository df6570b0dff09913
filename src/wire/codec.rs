//! Payload framing for the store and matcher
//!
//! Pure encode/decode functions; sockets live in [`crate::wire::client`].

use serde::Deserialize;

use crate::error::TouchprintError;
use crate::stroke::FeatureRecord;
use crate::wire::AuthVerdict;

pub const STORE_PREFIX: &str = "FSTORE|";
pub const COUNT_PREFIX: &str = "FCOUNT|";

/// Upper bound on any response we are willing to buffer
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// A decoded raw-socket request, as the store sees it
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Store(FeatureRecord),
    Count(i64),
}

/// `FSTORE|<json>`
pub fn encode_store(record: &FeatureRecord) -> Result<String, TouchprintError> {
    Ok(format!("{STORE_PREFIX}{}", record.to_json()?))
}

/// `FCOUNT|<userID>`
pub fn encode_count(user_id: i64) -> String {
    format!("{COUNT_PREFIX}{user_id}")
}

/// Decode a raw-socket request payload
pub fn decode_request(payload: &str) -> Result<WireRequest, TouchprintError> {
    if let Some(json) = payload.strip_prefix(STORE_PREFIX) {
        let record = FeatureRecord::from_json(json.trim_end())
            .map_err(|e| TouchprintError::ProtocolFailure(format!("bad FSTORE body: {e}")))?;
        return Ok(WireRequest::Store(record));
    }
    if let Some(id) = payload.strip_prefix(COUNT_PREFIX) {
        let user_id = id.trim().parse::<i64>().map_err(|_| {
            TouchprintError::ProtocolFailure(format!("bad FCOUNT user id: {:?}", id.trim()))
        })?;
        return Ok(WireRequest::Count(user_id));
    }
    let verb = payload.split('|').next().unwrap_or_default();
    Err(TouchprintError::ProtocolFailure(format!(
        "unknown request verb {verb:?}"
    )))
}

/// Parse the plain-text decimal count returned for `FCOUNT`
pub fn parse_count(response: &str) -> Result<u64, TouchprintError> {
    let trimmed = response.trim();
    trimmed.parse::<u64>().map_err(|_| {
        TouchprintError::ProtocolFailure(format!("count response is not an integer: {trimmed:?}"))
    })
}

/// Serialize the HTTP/1.1 authentication request
pub fn encode_auth_request(
    host: &str,
    auth_path: &str,
    record: &FeatureRecord,
    request_id: &str,
) -> Result<Vec<u8>, TouchprintError> {
    let body = record.to_json()?;
    let path = format!("{}/{}", auth_path.trim_end_matches('/'), record.user_id);
    let head = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: application/json\r\n\
         Accept: application/json\r\n\
         Content-Length: {}\r\n\
         X-Request-Id: {request_id}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body.as_bytes());
    Ok(bytes)
}

/// Status line and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Index just past the `\r\n\r\n` header terminator, if present
pub fn header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Value of the `Content-Length` header, if the headers carry one
pub fn content_length(head: &str) -> Option<usize> {
    head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// Parse a complete HTTP/1.1 response (as read up to connection close)
pub fn parse_http_response(raw: &[u8]) -> Result<HttpResponse, TouchprintError> {
    let end = header_end(raw).ok_or_else(|| {
        TouchprintError::ProtocolFailure("HTTP response has no header terminator".to_string())
    })?;
    let head = std::str::from_utf8(&raw[..end])
        .map_err(|_| TouchprintError::ProtocolFailure("HTTP headers are not UTF-8".to_string()))?;

    let status_line = head.lines().next().unwrap_or_default();
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TouchprintError::ProtocolFailure(format!(
            "bad HTTP status line: {status_line:?}"
        )));
    }
    let status: u16 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| {
        TouchprintError::ProtocolFailure(format!("bad HTTP status line: {status_line:?}"))
    })?;

    let chunked = head.lines().skip(1).any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        })
    });
    if chunked {
        return Err(TouchprintError::ProtocolFailure(
            "chunked HTTP responses are not supported".to_string(),
        ));
    }

    let mut body = &raw[end..];
    if let Some(len) = content_length(head) {
        if body.len() < len {
            return Err(TouchprintError::ProtocolFailure(format!(
                "HTTP body truncated: expected {len} bytes, got {}",
                body.len()
            )));
        }
        body = &body[..len];
    }

    Ok(HttpResponse {
        status,
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

#[derive(Deserialize)]
struct AuthBody {
    #[serde(rename = "match")]
    matched: MatchFlag,
    #[serde(default)]
    message: String,
}

/// The matcher sends `"true"`/`"false"`; a JSON boolean is accepted as well
#[derive(Deserialize)]
#[serde(untagged)]
enum MatchFlag {
    Bool(bool),
    Text(String),
}

impl MatchFlag {
    fn as_bool(&self) -> Option<bool> {
        match self {
            MatchFlag::Bool(b) => Some(*b),
            MatchFlag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }
}

/// Interpret the matcher's HTTP response.
///
/// - 2xx with a valid body → verdict
/// - 2xx with an unusable body → `ProtocolFailure`
/// - 5xx → `ServerFault`
/// - any other status → not matched, body text as the message
pub fn interpret_auth_response(response: &HttpResponse) -> Result<AuthVerdict, TouchprintError> {
    if response.is_server_error() {
        return Err(TouchprintError::ServerFault {
            status: response.status,
            message: response.body.trim().to_string(),
        });
    }
    if !response.is_success() {
        return Ok(AuthVerdict {
            matched: false,
            message: response.body.trim().to_string(),
            status: response.status,
        });
    }

    let body: AuthBody = serde_json::from_str(&response.body).map_err(|e| {
        TouchprintError::ProtocolFailure(format!("malformed authentication response: {e}"))
    })?;
    let matched = body.matched.as_bool().ok_or_else(|| {
        TouchprintError::ProtocolFailure("match flag is neither true nor false".to_string())
    })?;

    Ok(AuthVerdict {
        matched,
        message: body.message,
        status: response.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::{FeatureExtractor, Stroke, TouchSample};
    use pretty_assertions::assert_eq;

    fn record(user_id: i64) -> FeatureRecord {
        let stroke = Stroke::from_samples(vec![
            TouchSample::at(0.0, 0.0, 0).with_pressure(0.5),
            TouchSample::at(10.0, 0.0, 100).with_pressure(0.6),
        ]);
        FeatureExtractor::default().extract(user_id, &stroke)
    }

    fn http(raw: &str) -> HttpResponse {
        parse_http_response(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_store_frame_round_trip() {
        let rec = record(7);
        let payload = encode_store(&rec).unwrap();
        assert!(payload.starts_with("FSTORE|{"));
        assert_eq!(decode_request(&payload).unwrap(), WireRequest::Store(rec));
    }

    #[test]
    fn test_count_frame() {
        assert_eq!(encode_count(12), "FCOUNT|12");
        assert_eq!(decode_request("FCOUNT|12").unwrap(), WireRequest::Count(12));
        assert!(matches!(
            decode_request("FCOUNT|abc"),
            Err(TouchprintError::ProtocolFailure(_))
        ));
        assert!(matches!(
            decode_request("FDROP|1"),
            Err(TouchprintError::ProtocolFailure(_))
        ));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42").unwrap(), 42);
        assert_eq!(parse_count(" 17\r\n").unwrap(), 17);
        assert!(matches!(parse_count("abc"), Err(TouchprintError::ProtocolFailure(_))));
        assert!(matches!(parse_count(""), Err(TouchprintError::ProtocolFailure(_))));
        assert!(matches!(parse_count("-3"), Err(TouchprintError::ProtocolFailure(_))));
    }

    #[test]
    fn test_auth_request_shape() {
        let rec = record(9);
        let bytes = encode_auth_request("matcher:8080", "/authenticate/", &rec, "req-1").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("POST /authenticate/9 HTTP/1.1\r\n"));
        assert!(text.contains("Host: matcher:8080\r\n"));
        assert!(text.contains("X-Request-Id: req-1\r\n"));

        let end = header_end(text.as_bytes()).unwrap();
        let body = &text[end..];
        assert_eq!(content_length(&text[..end]), Some(body.len()));
        assert_eq!(FeatureRecord::from_json(body).unwrap(), rec);
    }

    #[test]
    fn test_parse_http_response_honours_content_length() {
        let resp = http("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokTRAILING");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "ok");
    }

    #[test]
    fn test_parse_http_response_rejects_garbage() {
        assert!(matches!(
            parse_http_response(b"garbage"),
            Err(TouchprintError::ProtocolFailure(_))
        ));
        assert!(matches!(
            parse_http_response(b"SMTP 220 hi\r\n\r\n"),
            Err(TouchprintError::ProtocolFailure(_))
        ));
        assert!(matches!(
            parse_http_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort"),
            Err(TouchprintError::ProtocolFailure(_))
        ));
        assert!(matches!(
            parse_http_response(concat!(
                "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n",
                "2\r\nok\r\n0\r\n\r\n"
            )
            .as_bytes()),
            Err(TouchprintError::ProtocolFailure(_))
        ));
    }

    #[test]
    fn test_interpret_match_false() {
        let resp = http("HTTP/1.1 200 OK\r\n\r\n{\"match\":\"false\",\"message\":\"no match\"}");
        let verdict = interpret_auth_response(&resp).unwrap();
        assert_eq!(
            verdict,
            AuthVerdict {
                matched: false,
                message: "no match".to_string(),
                status: 200,
            }
        );
    }

    #[test]
    fn test_interpret_match_true_and_bool_flag() {
        let resp = http("HTTP/1.1 200 OK\r\n\r\n{\"match\":\"true\",\"message\":\"welcome\"}");
        assert!(interpret_auth_response(&resp).unwrap().matched);

        let resp = http("HTTP/1.1 201 Created\r\n\r\n{\"match\":true}");
        let verdict = interpret_auth_response(&resp).unwrap();
        assert!(verdict.matched);
        assert_eq!(verdict.message, "");
    }

    #[test]
    fn test_interpret_malformed_success_body() {
        let resp = http("HTTP/1.1 200 OK\r\n\r\n<html>oops</html>");
        assert!(matches!(
            interpret_auth_response(&resp),
            Err(TouchprintError::ProtocolFailure(_))
        ));

        let resp = http("HTTP/1.1 200 OK\r\n\r\n{\"match\":\"maybe\"}");
        assert!(matches!(
            interpret_auth_response(&resp),
            Err(TouchprintError::ProtocolFailure(_))
        ));
    }

    #[test]
    fn test_interpret_server_fault() {
        let resp = http("HTTP/1.1 503 Service Unavailable\r\n\r\ndown for maintenance");
        match interpret_auth_response(&resp) {
            Err(TouchprintError::ServerFault { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "down for maintenance");
            }
            other => panic!("expected server fault, got {other:?}"),
        }
    }

    #[test]
    fn test_interpret_client_error_is_not_matched() {
        let resp = http("HTTP/1.1 404 Not Found\r\n\r\nunknown user");
        let verdict = interpret_auth_response(&resp).unwrap();
        assert!(!verdict.matched);
        assert_eq!(verdict.status, 404);
        assert_eq!(verdict.message, "unknown user");
    }
}
