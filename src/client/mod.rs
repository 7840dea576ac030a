//! HTTPMU client: socket lifecycle, periodic transmitter, response
//! collector and the orchestration that ties them together.
//!
//! One operation runs two tasks against the shared socket: the transmitter
//! re-sends the request on a fixed cadence while the collector reads and
//! parses whatever comes back. Both observe the same deadline, cancellation
//! and shutdown signals, and the operation completes when both have
//! finished.

#[allow(clippy::module_inception)]
mod client;
mod collect;
mod signals;
mod transmit;

pub use client::{HttpmuClient, ResponseReceiver};
pub use collect::{LOCAL_ADDRESS_HEADER, RECV_BUFFER_SIZE};
