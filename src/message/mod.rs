//! HTTPMU wire messages.
//!
//! This module holds the request and response message types and their
//! (deliberately minimal) wire grammar:
//!
//! - **Requests** are rendered as a request line, header fields and a
//!   terminating blank line — no body and no automatically added fields, so
//!   that unsophisticated listening devices are not confused by extras.
//! - **Responses** are parsed per datagram as a standard HTTP status line,
//!   header fields and an optional body. Non-conforming datagrams are
//!   rejected with a [`ParseError`] and dropped by the collector.
//!
//! Header values are treated as opaque text throughout; any structured
//! encoding of values (dates, fixed-point numbers, ...) is the business of a
//! codec layered on top of this crate.

mod headers;
mod request;
mod response;

pub use headers::Headers;
pub use request::{DEFAULT_METHOD, EncodeError, Request, RequestBuilder};
pub use response::{ParseError, Response};
