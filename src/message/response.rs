//! Response message parsing.

use thiserror::Error;

use super::headers::Headers;

/// Errors that can occur when parsing a datagram as an HTTP response.
///
/// These never surface from a client operation: the collector logs the
/// failure, drops the datagram and keeps reading. They exist so the drop can
/// be logged with a reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The datagram was empty.
    #[error("empty datagram")]
    Empty,

    /// The first line is not an HTTP status line.
    #[error("invalid status line")]
    InvalidStatusLine,

    /// The status code is not a three-digit number.
    #[error("invalid status code `{0}`")]
    InvalidStatusCode(String),

    /// A header line has no `name: value` shape.
    #[error("malformed header line")]
    MalformedHeader,
}

/// One parsed HTTP response received over UDP.
///
/// Produced by the collector for every datagram that parses as a response;
/// the collector additionally injects one header naming the local address
/// used for the exchange (see [`crate::LOCAL_ADDRESS_HEADER`]) before the
/// response is delivered. Ownership moves to the consumer through the output
/// queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Protocol version from the status line, e.g. `HTTP/1.1`.
    pub version: String,
    /// Three-digit status code.
    pub status: u16,
    /// Reason phrase; may be empty.
    pub reason: String,
    /// Header fields in the order they appeared.
    pub headers: Headers,
    /// Body bytes; empty for the typical discovery response.
    pub body: Vec<u8>,
}

impl Response {
    /// Parse one datagram as a complete HTTP response.
    ///
    /// Lenient where discovery devices are sloppy: bare-LF line endings are
    /// accepted, and a datagram that ends inside the header block (a
    /// truncated oversized response) yields the headers read so far with an
    /// empty body. Strict on the status line and the three-digit status
    /// code, which is what separates responses from arbitrary noise.
    pub fn parse(datagram: &[u8]) -> Result<Self, ParseError> {
        if datagram.is_empty() {
            return Err(ParseError::Empty);
        }

        let (head, body) = split_head_body(datagram);
        let head = String::from_utf8_lossy(head);
        let mut lines = head.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

        let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
        let (version, status, reason) = parse_status_line(status_line)?;

        let mut headers = Headers::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or(ParseError::MalformedHeader)?;
            let name = name.trim();
            if name.is_empty() || name.contains(' ') {
                return Err(ParseError::MalformedHeader);
            }
            headers.add(name, value.trim());
        }

        Ok(Response {
            version,
            status,
            reason,
            headers,
            body: body.to_vec(),
        })
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Split a datagram at the blank line separating headers from body.
///
/// Returns the whole datagram as head (empty body) when no blank line is
/// present, which happens when an oversized response was truncated by the
/// receive buffer.
fn split_head_body(datagram: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(datagram, b"\r\n\r\n") {
        (&datagram[..pos], &datagram[pos + 4..])
    } else if let Some(pos) = find(datagram, b"\n\n") {
        (&datagram[..pos], &datagram[pos + 2..])
    } else {
        (datagram, &[])
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_status_line(line: &str) -> Result<(String, u16, String), ParseError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidStatusLine);
    }

    let code = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidStatusCode(code.to_owned()));
    }
    let status: u16 = code.parse().map_err(|_| ParseError::InvalidStatusCode(code.to_owned()))?;

    let reason = parts.next().unwrap_or("").to_owned();
    Ok((version.to_owned(), status, reason))
}
