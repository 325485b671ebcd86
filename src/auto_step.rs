//! Repeated single steps on a fixed period until the backend reports
//! convergence, a tick fails, or someone stops the loop.
//!
//! `Idle -> Running -> Idle` (converged | failed | stopped).
//!
//! Ticks are serialized: a tick's response is awaited and applied before the
//! next period starts counting, so two requests are never in flight for the
//! same loop. Every start and stop bumps `loop_epoch`; a task whose epoch is
//! stale exits without touching the state or the sink, even if its request
//! was already on the wire.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::render::Notice;
use crate::session::Shared;
use crate::step;
use crate::wire::StepResponse;

/// Why an auto-step loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopExit {
    Converged { ticks: u64 },
    Failed { ticks: u64, error: Error },
    Cancelled,
}

pub(crate) struct AutoStepHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<LoopExit>,
}

impl AutoStepHandle {
    /// Wake the task so it notices its epoch is gone. Does not wait.
    pub(crate) fn cancel(&self) {
        let _ = self.stop.send(true);
    }

    pub(crate) async fn join(self) -> Option<LoopExit> {
        self.task.await.ok()
    }
}

/// Mark the session running and claim a fresh epoch.
pub(crate) fn begin(shared: &Shared) -> Result<u64> {
    let mut state = shared.state.lock();
    if !state.initialized {
        return Err(Error::NotInitialized);
    }
    state.loop_epoch += 1;
    state.running = true;
    info!(epoch = state.loop_epoch, "auto step started");
    Ok(state.loop_epoch)
}

/// Invalidate the current epoch. Returns whether a loop was running.
pub(crate) fn end(shared: &Shared) -> bool {
    let mut state = shared.state.lock();
    let was_running = state.running;
    state.loop_epoch += 1;
    state.running = false;
    if was_running {
        info!("auto step stopped");
    }
    was_running
}

pub(crate) fn spawn(shared: Arc<Shared>, epoch: u64, period: Duration) -> AutoStepHandle {
    let (stop, stopped) = watch::channel(false);
    let live = LiveLoop::enter(shared.clone());
    let task = tokio::spawn(run(live, epoch, period, stopped));
    AutoStepHandle { stop, task }
}

/// Counts a loop task as alive until it is dropped.
struct LiveLoop(Arc<Shared>);

impl LiveLoop {
    fn enter(shared: Arc<Shared>) -> Self {
        shared.live_loops.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for LiveLoop {
    fn drop(&mut self) {
        self.0.live_loops.fetch_sub(1, Ordering::SeqCst);
    }
}

enum Tick {
    Continue,
    Exit(LoopExit),
}

async fn run(
    live: LiveLoop,
    epoch: u64,
    period: Duration,
    mut stopped: watch::Receiver<bool>,
) -> LoopExit {
    let shared = &live.0;
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = stopped.changed() => return LoopExit::Cancelled,
        }

        let data = {
            let state = shared.state.lock();
            if state.loop_epoch != epoch {
                return LoopExit::Cancelled;
            }
            state.dataset.points().to_vec()
        };
        ticks += 1;
        debug!(epoch, tick = ticks, "auto step tick");

        let result = shared.service.step(&data).await;
        match settle(shared, epoch, ticks, result.map_err(Error::from)) {
            Tick::Continue => {}
            Tick::Exit(exit) => return exit,
        }
    }
}

/// Apply one tick's outcome if this loop is still the current one.
fn settle(
    shared: &Shared,
    epoch: u64,
    ticks: u64,
    result: Result<StepResponse>,
) -> Tick {
    let mut state = shared.state.lock();
    if state.loop_epoch != epoch {
        debug!(epoch, "discarding response for stopped loop");
        return Tick::Exit(LoopExit::Cancelled);
    }

    match result {
        Ok(response) => {
            step::apply(shared, &mut state, &response);
            if !response.converged {
                return Tick::Continue;
            }
            state.running = false;
            info!(ticks, iteration = ?response.iteration, "auto step converged");
            shared.notify(Notice::AutoStepConverged {
                iteration: response.iteration,
            });
            Tick::Exit(LoopExit::Converged { ticks })
        }
        Err(error) => {
            state.running = false;
            warn!(ticks, error = %error, "auto step failed");
            shared.notify(Notice::AutoStepFailed {
                error: error.to_string(),
            });
            Tick::Exit(LoopExit::Failed { ticks, error })
        }
    }
}
