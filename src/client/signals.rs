//! Signals bounding one client operation.
//!
//! The transmitter and the collector suspend on exactly two kinds of points:
//! their own work (the tick wait, the socket read) and these signals. Each
//! signal is a `select!` arm next to the work, so a blocked read or a
//! sleeping ticker is unblocked the moment a signal fires; there is no
//! cooperative polling of flags inside the loops.

use std::future::pending;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// The deadline, cancellation and shutdown signals shared by the two tasks
/// of one operation. Cheap to clone; each task owns its own copy.
#[derive(Clone)]
pub(crate) struct OpSignals {
    /// Absolute end of the collection window, if the request carries one.
    pub deadline: Option<Instant>,
    /// Caller-supplied cancellation signal, if the request carries one.
    pub cancel: Option<watch::Receiver<bool>>,
    /// Fires when the owning client is closed.
    pub shutdown: watch::Receiver<bool>,
}

/// Completes when the collection window elapses. Never completes for a
/// request without a deadline.
pub(crate) async fn window_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Completes when the caller's cancellation signal fires. Never completes
/// for a request without a signal, nor when the signal's sender is dropped
/// without ever firing.
pub(crate) async fn canceled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            if rx.wait_for(|canceled| *canceled).await.is_err() {
                pending::<()>().await;
            }
        }
        None => pending().await,
    }
}

/// Completes when the owning client is closed. A dropped sender counts as
/// closed, since it means the client itself is gone.
pub(crate) async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}
