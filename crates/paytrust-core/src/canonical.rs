//! Canonical message construction.
//!
//! Request direction:  `method\nuri\ntimestamp\nnonce\nbody\n`
//! Response direction: `timestamp\nnonce\nbody\n`
//!
//! The output is byte-exact. Nothing is escaped or normalised: the uri must be
//! the path and query exactly as sent on the wire, and the body must be the
//! exact bytes transmitted (empty when there is none).

use crate::types::{HttpMethod, Nonce, Timestamp};

const SEPARATOR: u8 = b'\n';

/// The byte string that gets hashed and signed (or verified).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage(Vec<u8>);

impl CanonicalMessage {
    /// Build the five-field message signed on outbound requests.
    pub fn request(
        method: HttpMethod,
        uri: &str,
        timestamp: Timestamp,
        nonce: &Nonce,
        body: &[u8],
    ) -> Self {
        let timestamp = timestamp.to_string();
        Self::join(&[
            method.as_str().as_bytes(),
            uri.as_bytes(),
            timestamp.as_bytes(),
            nonce.as_str().as_bytes(),
            body,
        ])
    }

    /// Build the three-field message the gateway signs on its responses.
    ///
    /// Timestamp and nonce are taken verbatim from the response headers.
    pub fn response(timestamp: &str, nonce: &str, body: &[u8]) -> Self {
        Self::join(&[timestamp.as_bytes(), nonce.as_bytes(), body])
    }

    fn join(fields: &[&[u8]]) -> Self {
        let len = fields.iter().map(|f| f.len() + 1).sum();
        let mut buf = Vec::with_capacity(len);
        for field in fields {
            buf.extend_from_slice(field);
            buf.push(SEPARATOR);
        }
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_message_get_without_body() {
        let msg = CanonicalMessage::request(
            HttpMethod::Get,
            "/v3/certificates",
            Timestamp::from_seconds(1_700_000_000),
            &Nonce::new("abc123"),
            b"",
        );
        assert_eq!(
            msg.as_bytes(),
            b"GET\n/v3/certificates\n1700000000\nabc123\n\n"
        );
    }

    #[test]
    fn test_request_message_keeps_query_and_body_verbatim() {
        let body = br#"{"stock_id":"9856000","out_request_no":"89560002019101000121"}"#;
        let msg = CanonicalMessage::request(
            HttpMethod::Post,
            "/v3/marketing/favor/users/o4GgauInH_RCEdvrrNGrntXDu6D4/coupons?appid=wx233544546545989&b=1&a=2",
            Timestamp::from_seconds(1_554_208_460),
            &Nonce::new("593BEC0C930BF1AFEB40B4A08C8FB242"),
            body,
        );
        let mut expected = b"POST\n/v3/marketing/favor/users/o4GgauInH_RCEdvrrNGrntXDu6D4/coupons?appid=wx233544546545989&b=1&a=2\n1554208460\n593BEC0C930BF1AFEB40B4A08C8FB242\n".to_vec();
        expected.extend_from_slice(body);
        expected.push(b'\n');
        assert_eq!(msg.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_query_order_changes_message() {
        let ts = Timestamp::from_seconds(1);
        let nonce = Nonce::new("n");
        let a = CanonicalMessage::request(HttpMethod::Get, "/v3/x?a=1&b=2", ts, &nonce, b"");
        let b = CanonicalMessage::request(HttpMethod::Get, "/v3/x?b=2&a=1", ts, &nonce, b"");
        assert_ne!(a, b);
    }

    #[test]
    fn test_response_message() {
        let msg = CanonicalMessage::response("1700000000", "abc123", br#"{"data":[]}"#);
        assert_eq!(msg.as_bytes(), b"1700000000\nabc123\n{\"data\":[]}\n");
    }

    #[test]
    fn test_response_message_empty_body_is_not_null() {
        let msg = CanonicalMessage::response("1", "n", b"");
        assert_eq!(msg.into_bytes(), b"1\nn\n\n".to_vec());
    }

    #[test]
    fn test_body_with_newlines_is_not_escaped() {
        let msg = CanonicalMessage::response("1", "n", b"a\nb");
        assert_eq!(msg.as_bytes(), b"1\nn\na\nb\n");
    }
}
