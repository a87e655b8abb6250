//! Liveness monitor
//!
//! One loop per socket. Each beat first checks that the previous beat was
//! acknowledged; a missing ACK means the connection is a zombie and the loop
//! hands over to [`GatewayConnection::on_zombie`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::GatewayConnection;

/// Handle on a running heartbeat loop
#[derive(Debug)]
pub(crate) struct HeartbeatHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub(crate) fn spawn(
        connection: Weak<GatewayConnection>,
        interval: Duration,
        poll: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run(connection, interval, poll, stop.clone()));
        Self { stop, task }
    }

    /// Ask the loop to exit; it notices within one poll period
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    connection: Weak<GatewayConnection>,
    interval: Duration,
    poll: Duration,
    stop: Arc<AtomicBool>,
) {
    tracing::debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let Some(conn) = connection.upgrade() else {
            break;
        };

        if !conn.take_heartbeat_ack() {
            conn.on_zombie();
            break;
        }
        conn.send_heartbeat().await;
        drop(conn);

        if wait_or_stop(interval, poll, &stop).await {
            break;
        }
    }

    tracing::debug!("Heartbeat stopped");
}

/// Sleep for `interval`, polling `stop` every `poll`. Returns `true` if
/// stopped early.
pub(crate) async fn wait_or_stop(interval: Duration, poll: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}
