use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use wrenchflow_core::TenantId;
use wrenchflow_events::{EventBus, Subscription, TenantScoped};

/// How often a worker wakes up to look for a shutdown request while the bus
/// is quiet.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        debug!(worker = self.name, "event worker stopped");
    }
}

/// Generic bus-consumer loop.
///
/// Feeds every published envelope to an idempotent handler: projections
/// keeping read models current, the auto-invoicer watching for completions.
/// Supports graceful shutdown and optional tenant pinning.
#[derive(Debug)]
pub struct EventWorker;

impl EventWorker {
    /// Spawn a worker thread consuming messages from the bus.
    ///
    /// With `tenant_id` set, messages for other shops are dropped before the
    /// handler sees them. Handler failures are logged and the loop moves on;
    /// at-least-once delivery means the message can come around again.
    pub fn spawn<M, B, H, E>(
        name: &'static str,
        bus: B,
        tenant_id: Option<TenantId>,
        mut handler: H,
    ) -> WorkerHandle
    where
        M: TenantScoped + Send + 'static,
        B: EventBus<M> + Send + Sync + 'static,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut processed = 0u64;

                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    let msg = match sub.recv_timeout(IDLE_TICK) {
                        Ok(msg) => msg,
                        Err(mpsc::RecvTimeoutError::Timeout) => continue,
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    };

                    // Tenant pinning: other shops' traffic is not ours.
                    if tenant_id.is_some_and(|t| msg.tenant_id() != t) {
                        continue;
                    }

                    match handler(msg) {
                        Ok(()) => processed += 1,
                        Err(err) => {
                            warn!(worker = name, error = ?err, "event worker handler failed");
                        }
                    }
                }

                debug!(worker = name, processed, "event worker loop exited");
            })
            .expect("failed to spawn event worker thread");

        WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}
