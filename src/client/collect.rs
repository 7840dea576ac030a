//! Response collector.
//!
//! Reads datagrams off the shared socket for the duration of the collection
//! window and turns the parseable ones into [`Response`] events. Failures
//! are classified at the point they occur: the window elapsing is the normal
//! end of collection, transient read errors are retried after a short
//! backoff, unparseable datagrams are dropped, and only genuine socket
//! failures (or the caller pulling the plug) end the operation with an
//! error.

use std::io;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{ClientError, ClientResult};
use crate::message::Response;

use super::signals::{OpSignals, canceled, closed, window_elapsed};

/// Name of the header injected into every delivered response, carrying the
/// local IP address that was used for the exchange. Callers use it to tell
/// which local interface discovered which device.
pub const LOCAL_ADDRESS_HEADER: &str = "x-httpmu-local-address";

/// Receive buffer capacity. Large enough for typical discovery responses;
/// anything bigger is truncated at this boundary.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Backoff after a transient read error, so a persistent failure cannot peg
/// the CPU for the remainder of the window.
const TRANSIENT_READ_DELAY: Duration = Duration::from_millis(10);

/// How a failed socket read is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadFailure {
    /// A timeout-shaped error: the designed end of the collection window.
    EndOfWindow,
    /// Likely momentary; retry after [`TRANSIENT_READ_DELAY`].
    Transient,
    /// Everything else ends the operation.
    Fatal,
}

fn classify_read_failure(error: &io::Error) -> ReadFailure {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ReadFailure::EndOfWindow,
        // ConnectionReset shows up on UDP sockets when a previous send drew
        // an ICMP unreachable; it says nothing about future reads.
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionReset => ReadFailure::Transient,
        _ => ReadFailure::Fatal,
    }
}

/// Drive the collection loop for one operation.
///
/// Returns `Ok(())` when the window elapses, `Canceled` when the caller's
/// signal fires, `Closed` when the client is closed mid-window, and an I/O
/// error only for fatal read failures. Responses are delivered through
/// `queue` as they arrive; the queue is unbounded, so delivery never blocks
/// the read loop (a slow consumer accumulates backlog instead of stalling
/// discovery).
pub(crate) async fn run_collect(
    socket: &UdpSocket,
    queue: mpsc::UnboundedSender<Response>,
    signals: OpSignals,
) -> ClientResult<()> {
    let OpSignals { deadline, mut cancel, mut shutdown } = signals;
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];

    loop {
        let (len, from) = tokio::select! {
            biased;
            _ = closed(&mut shutdown) => return Err(ClientError::Closed),
            _ = canceled(&mut cancel) => return Err(ClientError::Canceled),
            _ = window_elapsed(deadline) => return Ok(()),
            result = socket.recv_from(&mut buf) => match result {
                Ok(read) => read,
                Err(error) => match classify_read_failure(&error) {
                    ReadFailure::EndOfWindow => return Ok(()),
                    ReadFailure::Transient => {
                        debug!(%error, "transient read failure, backing off");
                        tokio::time::sleep(TRANSIENT_READ_DELAY).await;
                        continue;
                    }
                    ReadFailure::Fatal => return Err(error.into()),
                },
            },
        };

        let mut response = match Response::parse(&buf[..len]) {
            Ok(response) => response,
            Err(error) => {
                warn!(%from, len, %error, "dropping unparseable datagram");
                continue;
            }
        };

        if let Ok(local) = socket.local_addr() {
            response.headers.add(LOCAL_ADDRESS_HEADER, local.ip().to_string());
        }

        trace!(%from, status = response.status, "response collected");
        if queue.send(response).is_err() {
            debug!("response receiver dropped, discarding");
        }
    }
}
