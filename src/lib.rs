//! # httpmu
//!
//! HTTP over (multicast) UDP — a request/response transport primitive for
//! local network service discovery, in the style of SSDP/UPnP searches.
//!
//! A discovery exchange is nothing like a TCP request: the request is
//! broadcast or multicast to a network segment, zero-to-many devices reply
//! over a bounded window, and loss in either direction is a designed-for
//! outcome. This crate covers exactly that shape:
//!
//! - **Periodic transmit**: the request is re-sent on a fixed interval for
//!   the whole collection window, because any single datagram may be lost.
//! - **Open-ended collect**: every datagram that parses as an HTTP response
//!   is delivered through an async queue; noise is dropped, never fatal.
//! - **Caller-controlled window**: a deadline or cancellation signal on the
//!   request bounds the operation; the window elapsing is success.
//!
//! What this crate is **not**: a reliable transport. No delivery guarantee,
//! no ordering, no deduplication of replies, no flow control.
//!
//! ## Example: SSDP search
//!
//! ```no_run
//! use std::time::Duration;
//! use httpmu::{HttpmuClient, Request};
//!
//! # async fn search() -> Result<(), httpmu::ClientError> {
//! let (client, mut responses) = HttpmuClient::bind().await?;
//!
//! let request = Request::builder("239.255.255.250:1900")
//!     .method("M-SEARCH")
//!     .target("*")
//!     .header("HOST", "239.255.255.250:1900")
//!     .header("MAN", "\"ssdp:discover\"")
//!     .header("MX", "2")
//!     .header("ST", "ssdp:all")
//!     .timeout(Duration::from_secs(3))
//!     .build();
//!
//! client.perform(&request, Duration::from_secs(1)).await?;
//! client.close().await?;
//!
//! while let Some(response) = responses.recv().await {
//!     let local = response.headers.get(httpmu::LOCAL_ADDRESS_HEADER);
//!     println!("found {:?} via {:?}", response.headers.get("LOCATION"), local);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`message`]: request/response wire messages and the header multimap
//! - [`client`]: the client itself — lifecycle, transmit loop, collect loop
//! - [`error`]: the operation error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod message;

pub use client::{HttpmuClient, LOCAL_ADDRESS_HEADER, RECV_BUFFER_SIZE, ResponseReceiver};
pub use error::{ClientError, ClientResult};
pub use message::{EncodeError, Headers, ParseError, Request, RequestBuilder, Response};
