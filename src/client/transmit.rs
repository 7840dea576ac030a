//! Periodic request transmitter.
//!
//! Re-sends the caller's request on a fixed cadence for the whole duration
//! of the receive window. UDP discovery targets are free to miss any given
//! datagram, so repetition is the only delivery mechanism; there is no
//! acknowledgement and no backoff.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tracing::trace;

use crate::error::{ClientError, ClientResult};
use crate::message::Request;

use super::signals::{OpSignals, canceled, closed, window_elapsed};

/// Drive the transmit loop for one operation.
///
/// Sends one encoded copy of the request per `interval` tick (the first tick
/// fires immediately). Encoding, resolution and short writes are fatal and
/// end the operation; the loop otherwise only ends when the window elapses
/// or the caller cancels — both clean exits — or when the client is closed
/// underneath it.
pub(crate) async fn run_transmit(
    socket: &UdpSocket,
    request: &Request,
    interval: Duration,
    signals: OpSignals,
) -> ClientResult<()> {
    let OpSignals { deadline, mut cancel, mut shutdown } = signals;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = closed(&mut shutdown) => return Err(ClientError::Closed),
            _ = canceled(&mut cancel) => return Ok(()),
            _ = window_elapsed(deadline) => return Ok(()),
            _ = ticker.tick() => send_once(socket, request).await?,
        }
    }
}

/// Encode and transmit one copy of the request.
///
/// Encode and resolve happen per send, as callers may legitimately address
/// a DNS name whose resolution changes across a long window.
async fn send_once(socket: &UdpSocket, request: &Request) -> ClientResult<()> {
    let payload = request.encode()?;
    let dest = resolve(request.host()).await?;

    let written = socket.send_to(&payload, dest).await?;
    if written < payload.len() {
        return Err(ClientError::ShortWrite { written, expected: payload.len() });
    }

    trace!(%dest, bytes = written, "request transmitted");
    Ok(())
}

async fn resolve(host: &str) -> ClientResult<SocketAddr> {
    let addr = match lookup_host(host).await {
        Ok(mut addrs) => addrs.next(),
        Err(_) => None,
    };
    addr.ok_or_else(|| ClientError::Resolve { host: host.to_owned() })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::watch;
    use tokio::time::Instant;

    use super::*;

    async fn bind_pair() -> (UdpSocket, Arc<UdpSocket>, SocketAddr) {
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let sink_addr = sink.local_addr().unwrap();
        (sender, sink, sink_addr)
    }

    fn count_datagrams(sink: Arc<UdpSocket>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while sink.recv_from(&mut buf).await.is_ok() {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        count
    }

    fn signals(
        deadline: Option<Instant>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> (OpSignals, watch::Sender<bool>) {
        let (shutdown_tx, shutdown) = watch::channel(false);
        (OpSignals { deadline, cancel, shutdown }, shutdown_tx)
    }

    #[tokio::test]
    async fn test_transmits_until_deadline() {
        let (sender, sink, sink_addr) = bind_pair().await;
        let count = count_datagrams(sink);

        let request = Request::builder(sink_addr.to_string()).method("M-SEARCH").build();
        let deadline = Instant::now() + Duration::from_millis(220);
        let (signals, _shutdown_tx) = signals(Some(deadline), None);

        run_transmit(&sender, &request, Duration::from_millis(50), signals)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = count.load(Ordering::SeqCst);
        // Immediate first tick plus one per interval, within one tick of the
        // deadline either way.
        assert!(sent >= 2, "expected at least 2 sends, saw {sent}");
        assert!(sent <= 6, "expected at most 6 sends, saw {sent}");
    }

    #[tokio::test]
    async fn test_no_sends_after_cancellation() {
        let (sender, sink, sink_addr) = bind_pair().await;
        let count = count_datagrams(sink);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let request = Request::builder(sink_addr.to_string()).build();
        let (signals, _shutdown_tx) = signals(None, Some(cancel_rx));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(80)).await;
            let _ = cancel_tx.send(true);
        });

        run_transmit(&sender, &request, Duration::from_millis(30), signals)
            .await
            .unwrap();

        // Once the loop has observed the cancellation nothing more is sent.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let at_return = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_return);
    }

    #[tokio::test]
    async fn test_close_surfaces_as_error() {
        let (sender, _sink, sink_addr) = bind_pair().await;

        let request = Request::builder(sink_addr.to_string()).build();
        let (signals, shutdown_tx) = signals(None, None);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = shutdown_tx.send(true);
        });

        let result = run_transmit(&sender, &request, Duration::from_millis(20), signals).await;
        assert!(matches!(result, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn test_unresolvable_destination_is_fatal() {
        let (sender, _sink, _) = bind_pair().await;

        let request = Request::builder("definitely-not-a-host.invalid:1900").build();
        let deadline = Instant::now() + Duration::from_secs(5);
        let (signals, _shutdown_tx) = signals(Some(deadline), None);

        let start = Instant::now();
        let result = run_transmit(&sender, &request, Duration::from_millis(20), signals).await;
        assert!(matches!(result, Err(ClientError::Resolve { .. })));
        // Fatal on the first tick, nowhere near the deadline.
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_unencodable_request_is_fatal() {
        let (sender, _sink, sink_addr) = bind_pair().await;

        let request = Request::builder(sink_addr.to_string())
            .header("ST", "ssdp:all\r\nEvil: yes")
            .build();
        let (signals, _shutdown_tx) = signals(Some(Instant::now() + Duration::from_secs(5)), None);

        let result = run_transmit(&sender, &request, Duration::from_millis(20), signals).await;
        assert!(matches!(result, Err(ClientError::Encode(_))));
    }
}
