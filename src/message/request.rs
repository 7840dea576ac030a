//! Request descriptor and wire encoding.

use std::fmt::Write as _;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

use super::headers::Headers;

/// Method used when a request does not specify one.
pub const DEFAULT_METHOD: &str = "GET";

/// Errors that can occur when rendering a request into its wire form.
///
/// The wire grammar is line-oriented, so any CR or LF smuggled into a method,
/// target or header field would corrupt the framing of the datagram. Encoding
/// failures are fatal to the operation that attempted the send.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The method contains characters that cannot appear in a request line.
    #[error("method contains illegal characters")]
    InvalidMethod,

    /// The request target contains characters that cannot appear in a
    /// request line.
    #[error("request target contains illegal characters")]
    InvalidTarget,

    /// A header name or value contains characters that cannot appear in a
    /// header field.
    #[error("header `{name}` contains illegal characters")]
    InvalidHeader {
        /// Name of the offending header field.
        name: String,
    },
}

fn is_clean_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c == '\r' || c == '\n' || c == ' ')
}

fn is_clean_text(s: &str) -> bool {
    !s.chars().any(|c| c == '\r' || c == '\n')
}

/// An immutable description of one HTTPMU request.
///
/// A request bundles the message to send (method, target, headers), the
/// destination address, and the control signals bounding the operation: an
/// optional deadline and an optional cancellation signal. It is supplied per
/// operation and only read by the client.
///
/// Built via [`RequestBuilder`]:
///
/// ```
/// use std::time::Duration;
/// use httpmu::Request;
///
/// let request = Request::builder("239.255.255.250:1900")
///     .method("M-SEARCH")
///     .target("*")
///     .header("MAN", "\"ssdp:discover\"")
///     .header("MX", "2")
///     .header("ST", "ssdp:all")
///     .timeout(Duration::from_secs(3))
///     .build();
/// assert_eq!(request.method(), "M-SEARCH");
/// ```
pub struct Request {
    method: String,
    target: String,
    headers: Headers,
    host: String,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl Request {
    /// Start building a request addressed to `host` (a `host:port` string,
    /// typically a multicast group such as `239.255.255.250:1900`).
    pub fn builder(host: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(host)
    }

    /// The request method. Defaults to `GET`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request target (resource path).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The destination `host:port`.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The header fields sent with the request.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The absolute deadline bounding the operation, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn cancel_signal(&self) -> Option<watch::Receiver<bool>> {
        self.cancel.clone()
    }

    /// Render the request into the exact bytes that go on the wire:
    /// request line, header fields in insertion order, terminating blank
    /// line. No body and no automatic fields — a deliberately minimal subset
    /// of the full HTTP grammar, to avoid confusing unsophisticated
    /// listening devices.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let method = if self.method.is_empty() {
            DEFAULT_METHOD
        } else {
            self.method.as_str()
        };
        if !is_clean_token(method) {
            return Err(EncodeError::InvalidMethod);
        }
        if !is_clean_token(&self.target) {
            return Err(EncodeError::InvalidTarget);
        }

        let mut wire = String::new();
        let _ = write!(wire, "{method} {} HTTP/1.1\r\n", self.target);
        for (name, value) in self.headers.iter() {
            if !is_clean_token(name) || name.contains(':') || !is_clean_text(value) {
                return Err(EncodeError::InvalidHeader { name: name.to_owned() });
            }
            let _ = write!(wire, "{name}: {value}\r\n");
        }
        wire.push_str("\r\n");
        Ok(wire.into_bytes())
    }
}

/// Builder for [`Request`].
pub struct RequestBuilder {
    method: String,
    target: String,
    headers: Headers,
    host: String,
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestBuilder {
    /// Create a builder for a request addressed to `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            method: DEFAULT_METHOD.to_owned(),
            target: "*".to_owned(),
            headers: Headers::new(),
            host: host.into(),
            deadline: None,
            cancel: None,
        }
    }

    /// Set the request method (e.g. `M-SEARCH`). Defaults to `GET`.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the request target. Defaults to `*`.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Append a header field.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Replace the header collection wholesale.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Bound the operation by an absolute deadline.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Bound the operation by a window measured from now.
    pub fn timeout(mut self, window: Duration) -> Self {
        self.deadline = Some(Instant::now() + window);
        self
    }

    /// Attach a cancellation signal. The operation ends promptly once the
    /// watched value flips to `true`.
    pub fn cancel_signal(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Finish building the request.
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            target: self.target,
            headers: self.headers,
            host: self.host,
            deadline: self.deadline,
            cancel: self.cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_minimal_request() {
        let request = Request::builder("239.255.255.250:1900").build();
        let wire = request.encode().unwrap();
        assert_eq!(wire, b"GET * HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_encode_search_request() {
        let request = Request::builder("239.255.255.250:1900")
            .method("M-SEARCH")
            .target("*")
            .header("HOST", "239.255.255.250:1900")
            .header("MAN", "\"ssdp:discover\"")
            .header("MX", "2")
            .build();

        let wire = String::from_utf8(request.encode().unwrap()).unwrap();
        assert_eq!(
            wire,
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: 239.255.255.250:1900\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: 2\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_encode_defaults_empty_method_to_get() {
        let request = Request::builder("example.local:1900").method("").build();
        let wire = String::from_utf8(request.encode().unwrap()).unwrap();
        assert!(wire.starts_with("GET * HTTP/1.1\r\n"));
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        let request = Request::builder("h:1").method("GE\rT").build();
        assert_eq!(request.encode(), Err(EncodeError::InvalidMethod));

        let request = Request::builder("h:1").target("/a\nb").build();
        assert_eq!(request.encode(), Err(EncodeError::InvalidTarget));

        let request = Request::builder("h:1")
            .header("ST", "ssdp:all\r\nEvil: yes")
            .build();
        assert_eq!(
            request.encode(),
            Err(EncodeError::InvalidHeader { name: "ST".into() })
        );

        let request = Request::builder("h:1").header("Bad Name", "v").build();
        assert!(matches!(
            request.encode(),
            Err(EncodeError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_builder_deadline_from_timeout() {
        let before = Instant::now();
        let request = Request::builder("h:1")
            .timeout(Duration::from_secs(3))
            .build();
        let deadline = request.deadline().unwrap();
        assert!(deadline >= before + Duration::from_secs(3));
        assert!(deadline <= Instant::now() + Duration::from_secs(3));
    }

    #[test]
    fn test_request_without_bounds_has_no_deadline() {
        let request = Request::builder("h:1").build();
        assert!(request.deadline().is_none());
        assert!(request.cancel_signal().is_none());
    }
}
