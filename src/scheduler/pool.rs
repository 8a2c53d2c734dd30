use anyhow::Result;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::vu::{self, VuShared};

struct VuHandle {
    id: u64,
    stop: CancellationToken,
    task: JoinHandle<Result<u64>>,
}

/// The set of running virtual-user loops.
///
/// `active` loops count toward the target. `retiring` loops have been asked
/// to stop and are finishing their current iteration.
pub struct VuPool {
    shared: Arc<VuShared>,
    root: CancellationToken,
    active: Vec<VuHandle>,
    retiring: Vec<VuHandle>,
    next_id: u64,
    active_tx: watch::Sender<u64>,
}

impl VuPool {
    pub fn new(shared: Arc<VuShared>) -> Self {
        let (active_tx, _) = watch::channel(0);
        Self {
            shared,
            root: CancellationToken::new(),
            active: Vec::new(),
            retiring: Vec::new(),
            next_id: 1,
            active_tx,
        }
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }

    pub fn retiring(&self) -> usize {
        self.retiring.len()
    }

    /// Number of loops ever started, including replacements.
    pub fn spawned(&self) -> u64 {
        self.next_id - 1
    }

    /// Live view of the active loop count.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.active_tx.subscribe()
    }

    /// Bring the number of active loops to `target`.
    ///
    /// New loops start immediately. Surplus loops (newest first) are asked
    /// to stop after their current iteration. Loops that exited on their own
    /// are reaped first, so they are replaced in the same call.
    pub fn reconcile(&mut self, target: usize) {
        self.reap();

        while self.active.len() < target {
            self.spawn();
        }
        while self.active.len() > target {
            if let Some(vu) = self.active.pop() {
                debug!(vu_id = vu.id, "retiring virtual user");
                vu.stop.cancel();
                self.retiring.push(vu);
            }
        }

        let active = self.active.len() as u64;
        self.shared.metrics.observe_vus(active);
        self.active_tx.send_replace(active);
    }

    /// Stop every loop after its current iteration and wait for all of them.
    pub async fn drain(mut self) {
        self.root.cancel();
        let handles: Vec<VuHandle> = self.active.drain(..).chain(self.retiring.drain(..)).collect();
        self.active_tx.send_replace(0);
        info!(remaining = handles.len(), "draining virtual users");

        for vu in handles {
            log_exit(vu.id, vu.task.await);
        }
    }

    fn spawn(&mut self) {
        let id = self.next_id;
        self.next_id += 1;
        let stop = self.root.child_token();
        let task = tokio::spawn(vu::run(id, Arc::clone(&self.shared), stop.clone()));
        debug!(vu_id = id, "started virtual user");
        self.active.push(VuHandle { id, stop, task });
    }

    fn reap(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|vu| vu.task.is_finished());
        self.active = running;
        for mut vu in finished {
            if let Some(result) = (&mut vu.task).now_or_never() {
                log_exit(vu.id, result);
            }
            warn!(vu_id = vu.id, "virtual user exited early, replacing");
        }

        self.retiring.retain_mut(|vu| match (&mut vu.task).now_or_never() {
            Some(result) => {
                log_exit(vu.id, result);
                false
            }
            None => true,
        });
    }
}

fn log_exit(vu_id: u64, result: Result<Result<u64>, JoinError>) {
    match result {
        Ok(Ok(iterations)) => debug!(vu_id, iterations, "virtual user finished"),
        Ok(Err(e)) => error!(vu_id, error = %format!("{e:#}"), "virtual user failed"),
        Err(e) => error!(vu_id, error = %e, "virtual user panicked"),
    }
}
