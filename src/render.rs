use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::point::Point;

/// One scatter plot: the dataset, the centroids and, once the backend has
/// assigned them, one label per point. Empty `labels` means "points only".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<'a> {
    pub points: &'a [Point],
    pub centroids: &'a [Point],
    pub labels: &'a [usize],
}

impl<'a> Frame<'a> {
    pub const EMPTY: Frame<'static> = Frame {
        points: &[],
        centroids: &[],
        labels: &[],
    };

    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            points: self.points.to_vec(),
            centroids: self.centroids.to_vec(),
            labels: self.labels.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OwnedFrame {
    pub points: Vec<Point>,
    pub centroids: Vec<Point>,
    pub labels: Vec<usize>,
}

/// Messages meant for the person watching, as opposed to log lines.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The auto-step loop saw `converged = true`.
    AutoStepConverged { iteration: Option<u64> },
    /// The auto-step loop stopped on a failed tick.
    AutoStepFailed { error: String },
    /// A run-to-convergence request finished.
    ConvergedIn { iterations: u64 },
    /// Step and run-to-convergence became available (or not).
    ControlsEnabled(bool),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::AutoStepConverged { iteration: Some(i) } => {
                write!(f, "KMeans has converged after {} iterations!", i)
            }
            Notice::AutoStepConverged { iteration: None } => write!(f, "KMeans has converged!"),
            Notice::AutoStepFailed { error } => write!(f, "Auto step stopped: {}", error),
            Notice::ConvergedIn { iterations } => {
                write!(f, "KMeans converged in {} iterations!", iterations)
            }
            Notice::ControlsEnabled(true) => write!(f, "step and converge enabled"),
            Notice::ControlsEnabled(false) => write!(f, "step and converge disabled"),
        }
    }
}

/// Where frames end up. Rendering cannot fail; sinks log their own trouble.
pub trait RenderSink: Send {
    fn render(&mut self, frame: Frame<'_>);

    fn notify(&mut self, notice: &Notice) {
        info!(%notice, "notice");
    }
}

#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<OwnedFrame>,
    notices: Vec<Notice>,
}

/// Keeps every frame and notice. Clones share the same recording, so one
/// clone can be handed to a session and the other inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<OwnedFrame> {
        self.inner.lock().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn last_frame(&self) -> Option<OwnedFrame> {
        self.inner.lock().frames.last().cloned()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.inner.lock().notices.clone()
    }
}

impl RenderSink for RecordingSink {
    fn render(&mut self, frame: Frame<'_>) {
        self.inner.lock().frames.push(frame.to_owned_frame());
    }

    fn notify(&mut self, notice: &Notice) {
        self.inner.lock().notices.push(notice.clone());
    }
}
