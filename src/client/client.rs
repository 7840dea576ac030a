//! The HTTPMU client: socket ownership, lifecycle and orchestration.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, mpsc, watch};

use crate::error::{ClientError, ClientResult};
use crate::message::{Request, Response};

use super::collect::run_collect;
use super::signals::OpSignals;
use super::transmit::run_transmit;

/// Lifecycle state guarded against concurrent close vs. use. This is the
/// only mutable state in the client; the socket itself supports concurrent
/// reads and writes from the two operation tasks.
struct Lifecycle {
    closed: bool,
    /// Sending half of the output queue. Dropped at close so the queue
    /// closes once any in-flight operation lets go of its clone.
    queue: Option<mpsc::UnboundedSender<Response>>,
}

/// A client for HTTP-over-UDP exchanges, typically HTTPMU discovery
/// searches in the SSDP style.
///
/// The client owns one bound UDP socket for its whole lifetime. An
/// operation ([`HttpmuClient::perform`]) re-sends a request periodically
/// while collecting whatever responses arrive; zero responses is a normal
/// outcome on an unreliable, one-to-many channel.
///
/// The documented usage pattern is one operation at a time per client.
///
/// ```no_run
/// use std::time::Duration;
/// use httpmu::{HttpmuClient, Request};
///
/// # async fn search() -> Result<(), httpmu::ClientError> {
/// let (client, mut responses) = HttpmuClient::bind().await?;
///
/// let request = Request::builder("239.255.255.250:1900")
///     .method("M-SEARCH")
///     .target("*")
///     .header("HOST", "239.255.255.250:1900")
///     .header("MAN", "\"ssdp:discover\"")
///     .header("MX", "2")
///     .header("ST", "ssdp:all")
///     .timeout(Duration::from_secs(3))
///     .build();
///
/// client.perform(&request, Duration::from_secs(1)).await?;
/// client.close().await?;
///
/// while let Some(response) = responses.recv().await {
///     println!("device at {:?}", response.headers.get("LOCATION"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct HttpmuClient {
    socket: UdpSocket,
    lifecycle: Mutex<Lifecycle>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HttpmuClient {
    /// Bind a client to an ephemeral port on the unspecified address.
    pub async fn bind() -> ClientResult<(Self, ResponseReceiver)> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .map_err(ClientError::Bind)?;
        Ok(Self::from_socket(socket))
    }

    /// Bind a client to an ephemeral port on a specific local address, so
    /// that requests leave through a chosen interface.
    pub async fn bind_addr(addr: &str) -> ClientResult<(Self, ResponseReceiver)> {
        let ip: IpAddr = addr
            .parse()
            .map_err(|_| ClientError::InvalidBindAddress(addr.to_owned()))?;
        let socket = UdpSocket::bind((ip, 0)).await.map_err(ClientError::Bind)?;
        Ok(Self::from_socket(socket))
    }

    fn from_socket(socket: UdpSocket) -> (Self, ResponseReceiver) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let client = Self {
            socket,
            lifecycle: Mutex::new(Lifecycle { closed: false, queue: Some(queue_tx) }),
            shutdown_tx,
            shutdown_rx,
        };
        (client, ResponseReceiver { queue: queue_rx })
    }

    /// The local address the client is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Shut the client down.
    ///
    /// Closes the output queue (no further responses can be delivered) and
    /// unblocks any in-flight operation promptly; that operation finishes
    /// with [`ClientError::Closed`]. Safe to call more than once; the client
    /// must not be used afterwards. The socket itself is released when the
    /// client value is dropped.
    pub async fn close(&self) -> ClientResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.closed {
            return Ok(());
        }
        lifecycle.closed = true;
        lifecycle.queue = None;
        let _ = self.shutdown_tx.send(true);
        Ok(())
    }

    /// Perform one request/response operation.
    ///
    /// Concurrently re-sends `request` every `interval` (which must be
    /// positive; the first send happens immediately) and collects responses
    /// into the queue handed out at construction, until the request's
    /// deadline elapses or its cancellation signal fires. Waits for both
    /// halves to finish; send-side failures take precedence in the returned
    /// result, and the window elapsing is success, not an error.
    ///
    /// An error means the periodic send could not be guaranteed or the
    /// window was aborted abnormally. Responses already delivered remain
    /// valid and are not retracted.
    ///
    /// # Liveness
    ///
    /// If `request` carries **neither a deadline nor a cancellation signal,
    /// this method never returns**: the operation is designed to run for the
    /// full window, and an unbounded request has an unbounded window. Bound
    /// every request with [`timeout`](crate::RequestBuilder::timeout),
    /// [`deadline`](crate::RequestBuilder::deadline) or
    /// [`cancel_signal`](crate::RequestBuilder::cancel_signal), or close the
    /// client from another task. This is a usage contract, not something the
    /// client guards against.
    pub async fn perform(&self, request: &Request, interval: Duration) -> ClientResult<()> {
        let queue = {
            let lifecycle = self.lifecycle.lock().await;
            if lifecycle.closed {
                return Err(ClientError::Closed);
            }
            // The clone keeps the queue open for the duration of the
            // operation even if the client is closed mid-window.
            lifecycle.queue.clone().ok_or(ClientError::Closed)?
        };

        let signals = OpSignals {
            deadline: request.deadline(),
            cancel: request.cancel_signal(),
            shutdown: self.shutdown_rx.clone(),
        };

        let (sent, collected) = tokio::join!(
            run_transmit(&self.socket, request, interval, signals.clone()),
            run_collect(&self.socket, queue, signals),
        );
        sent.and(collected)
    }
}

/// Receiving half of the response queue, handed out when the client is
/// created.
///
/// The queue is unbounded: a slow consumer accumulates backlog rather than
/// stalling collection. Responses survive the end of the operation that
/// collected them; after the client is closed and the backlog drained,
/// [`recv`](ResponseReceiver::recv) yields `None`.
pub struct ResponseReceiver {
    queue: mpsc::UnboundedReceiver<Response>,
}

impl ResponseReceiver {
    /// Receive the next response, waiting if none is queued. Returns `None`
    /// once the client is closed and the backlog is drained.
    pub async fn recv(&mut self) -> Option<Response> {
        self.queue.recv().await
    }

    /// Take the next response without waiting.
    pub fn try_recv(&mut self) -> Option<Response> {
        self.queue.try_recv().ok()
    }
}
