//! Watch a remote K-means service cluster a 2D dataset.
//!
//! The numerics live in the backend behind three endpoints
//! (`/initialize_kmeans`, `/step_kmeans`, `/run_to_convergence`). This crate
//! owns the dataset, the manual centroid picks and the sequencing: initialize,
//! single steps, a timed auto-step loop and one-shot convergence, each
//! followed by exactly one render of the resulting state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kmeans_viz::{Config, HttpClusteringService, Session, TerminalPlot};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::default();
//! let service = HttpClusteringService::new(config.base_url.clone(), config.request_timeout)?;
//! let mut session = Session::new(config, Arc::new(service), Box::new(TerminalPlot::new(std::io::stdout())));
//! session.generate();
//! session.initialize().await?;
//! session.run_to_convergence().await?;
//! # Ok(())
//! # }
//! ```

pub mod auto_step;
pub mod command;
pub mod config;
mod converge;
pub mod dataset;
pub mod error;
mod init;
pub mod manual;
pub mod plot;
pub mod point;
pub mod render;
pub mod service;
pub mod session;
mod step;
pub mod wire;

pub use auto_step::LoopExit;
pub use config::Config;
pub use dataset::{CentroidSet, Dataset};
pub use error::{Error, Result, ServiceError};
pub use manual::Selection;
pub use plot::{JsonLinesSink, TerminalPlot};
pub use point::Point;
pub use render::{Frame, Notice, OwnedFrame, RecordingSink, RenderSink};
pub use service::{Call, ClusteringService, HttpClusteringService, ScriptedService};
pub use session::{Session, SessionState};
pub use wire::InitMethod;
