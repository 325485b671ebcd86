//! The single clustering session and the dataset operations on it.
//!
//! [`Session`] owns the state, the backend and the render sink. Each
//! controller module (`init`, `manual`, `step`, `auto_step`, `converge`)
//! works on the shared part through `&Shared`; `Session` is the entry point
//! user events go through.
//!
//! Locks are never held across an `.await`. When both are needed, the
//! state lock is taken before the sink lock.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auto_step::{self, AutoStepHandle, LoopExit};
use crate::config::Config;
use crate::converge;
use crate::dataset::{CentroidSet, Dataset};
use crate::error::{Error, Result};
use crate::init;
use crate::manual::{self, Selection};
use crate::point::Point;
use crate::render::{Frame, Notice, RenderSink};
use crate::service::ClusteringService;
use crate::step;
use crate::wire::{ConvergenceResponse, InitMethod, StepResponse};

/// Everything the session knows. Cloned out by [`Session::state`].
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub dataset: Dataset,
    /// Manual picks, in click order.
    pub selected: CentroidSet,
    /// Centroids last returned by the backend.
    pub centroids: Vec<Point>,
    /// Latest cluster assignment, index-aligned with `dataset`.
    pub labels: Vec<usize>,
    pub initialized: bool,
    /// Auto-step loop active.
    pub running: bool,
    pub init_method: InitMethod,
    /// The numeric cluster-count input.
    pub cluster_count: usize,
    /// `k` sent with the last successful initialize.
    pub session_k: Option<usize>,
    /// Whether "single step" and "run to convergence" are offered.
    pub controls_enabled: bool,
    pub(crate) loop_epoch: u64,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<SessionState>,
    sink: Mutex<Box<dyn RenderSink>>,
    pub(crate) service: Arc<dyn ClusteringService>,
    pub(crate) live_loops: AtomicUsize,
}

impl Shared {
    pub(crate) fn render(&self, frame: Frame<'_>) {
        debug!(
            points = frame.points.len(),
            centroids = frame.centroids.len(),
            labels = frame.labels.len(),
            "render"
        );
        self.sink.lock().render(frame);
    }

    /// Dataset with the backend's centroids and labels.
    pub(crate) fn render_state(&self, state: &SessionState) {
        self.render(Frame {
            points: state.dataset.points(),
            centroids: &state.centroids,
            labels: &state.labels,
        });
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.sink.lock().notify(&notice);
    }

    /// Copy of the dataset, or `NotInitialized` before a successful initialize.
    pub(crate) fn initialized_data(&self) -> Result<Vec<Point>> {
        let state = self.state.lock();
        if !state.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(state.dataset.points().to_vec())
    }
}

pub struct Session {
    shared: Arc<Shared>,
    config: Config,
    rng: StdRng,
    auto_step: Option<AutoStepHandle>,
}

impl Session {
    pub fn new(
        config: Config,
        service: Arc<dyn ClusteringService>,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = SessionState {
            init_method: config.init_method,
            cluster_count: config.cluster_count,
            ..Default::default()
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                sink: Mutex::new(sink),
                service,
                live_loops: AtomicUsize::new(0),
            }),
            config,
            rng,
            auto_step: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the dataset with `dataset_size` uniform random points.
    pub fn generate(&mut self) {
        self.generate_n(self.config.dataset_size);
    }

    pub fn generate_n(&mut self, n: usize) {
        let dataset = Dataset::generate(
            n,
            self.config.x_range.clone(),
            self.config.y_range.clone(),
            &mut self.rng,
        );
        self.load(dataset);
    }

    /// Install an externally supplied dataset, exactly like `generate`.
    pub fn load(&mut self, dataset: Dataset) {
        self.halt_auto_step();
        let mut state = self.shared.state.lock();
        info!(points = dataset.len(), "new dataset");
        state.dataset = dataset;
        state.selected.clear();
        state.centroids.clear();
        state.labels.clear();
        state.initialized = false;
        state.session_k = None;
        state.controls_enabled = true;
        self.shared.render(Frame {
            points: state.dataset.points(),
            centroids: &[],
            labels: &[],
        });
        self.shared.notify(Notice::ControlsEnabled(true));
    }

    /// Drop the dataset and every derived piece of state.
    pub fn reset(&mut self) {
        self.halt_auto_step();
        let mut state = self.shared.state.lock();
        info!("reset");
        state.dataset = Dataset::default();
        state.selected.clear();
        state.centroids.clear();
        state.labels.clear();
        state.initialized = false;
        state.running = false;
        state.session_k = None;
        state.controls_enabled = false;
        self.shared.render(Frame::EMPTY);
        self.shared.notify(Notice::ControlsEnabled(false));
    }

    pub fn set_init_method(&self, method: InitMethod) {
        self.shared.state.lock().init_method = method;
    }

    pub fn set_cluster_count(&self, k: usize) {
        self.shared.state.lock().cluster_count = k;
    }

    pub fn on_point_clicked(&self, x: f64, y: f64) -> Result<Selection> {
        manual::on_point_clicked(&self.shared, Point::new(x, y))
    }

    pub async fn initialize(&self) -> Result<Vec<Point>> {
        init::initialize(&self.shared, self.config.run_immediately).await
    }

    pub async fn step(&self) -> Result<StepResponse> {
        step::step(&self.shared).await
    }

    pub async fn run_to_convergence(&self) -> Result<ConvergenceResponse> {
        converge::run_to_convergence(&self.shared).await
    }

    /// Start the auto-step loop, replacing one that is already running.
    pub fn start_auto_step(&mut self) -> Result<()> {
        let epoch = auto_step::begin(&self.shared)?;
        if let Some(previous) = self.auto_step.take() {
            previous.cancel();
        }
        self.auto_step = Some(auto_step::spawn(
            self.shared.clone(),
            epoch,
            self.config.tick_period,
        ));
        Ok(())
    }

    /// Stop the auto-step loop. Returns whether one was running.
    pub fn stop_auto_step(&mut self) -> bool {
        let was_running = auto_step::end(&self.shared);
        if let Some(handle) = self.auto_step.take() {
            handle.cancel();
        }
        was_running
    }

    /// Wait for the current auto-step loop to finish on its own.
    pub async fn wait_auto_step(&mut self) -> Option<LoopExit> {
        let handle = self.auto_step.take()?;
        handle.join().await
    }

    fn halt_auto_step(&mut self) {
        if self.stop_auto_step() {
            debug!("auto step halted by dataset change");
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.state.lock().initialized
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Auto-step tasks that have not exited yet.
    pub fn active_loops(&self) -> usize {
        self.shared.live_loops.load(Ordering::SeqCst)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_step.take() {
            auto_step::end(&self.shared);
            handle.cancel();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::{OwnedFrame, RecordingSink};
    use crate::service::ScriptedService;

    pub(crate) fn session_with(
        config: Config,
    ) -> (Session, Arc<ScriptedService>, RecordingSink) {
        let service = Arc::new(ScriptedService::new());
        let sink = RecordingSink::new();
        let session = Session::new(config.with_seed(42), service.clone(), Box::new(sink.clone()));
        (session, service, sink)
    }

    #[test]
    fn test_generate_renders_bare_dataset() {
        let (mut session, _, sink) = session_with(Config::default());
        session.generate();

        let state = session.state();
        assert_eq!(state.dataset.len(), 100);
        assert!(state.controls_enabled);
        assert!(!state.initialized);

        let frame = sink.last_frame().unwrap();
        assert_eq!(frame.points.len(), 100);
        assert!(frame.centroids.is_empty());
        assert!(frame.labels.is_empty());
        assert_eq!(sink.notices(), vec![Notice::ControlsEnabled(true)]);
    }

    #[test]
    fn test_generate_clears_picks() {
        let (mut session, _, _) = session_with(Config::default().with_init_method(InitMethod::Manual));
        session.generate();
        session.on_point_clicked(1.0, 1.0).unwrap();
        assert_eq!(session.state().selected.len(), 1);

        session.generate_n(10);
        let state = session.state();
        assert!(state.selected.is_empty());
        assert_eq!(state.dataset.len(), 10);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut session, _, sink) = session_with(Config::default().with_init_method(InitMethod::Manual));
        session.generate();
        session.on_point_clicked(2.0, 3.0).unwrap();
        session.reset();

        let state = session.state();
        assert!(state.dataset.is_empty());
        assert!(state.selected.is_empty());
        assert!(!state.initialized);
        assert!(!state.running);
        assert!(!state.controls_enabled);
        assert_eq!(sink.last_frame().unwrap(), OwnedFrame::default());
        assert_eq!(sink.notices().last(), Some(&Notice::ControlsEnabled(false)));
    }

    #[test]
    fn test_seeded_sessions_generate_same_points() {
        let (mut a, _, _) = session_with(Config::default());
        let (mut b, _, _) = session_with(Config::default());
        a.generate();
        b.generate();
        assert_eq!(a.state().dataset, b.state().dataset);
    }
}
