use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::render::Notice;
use crate::session::Shared;
use crate::wire::ConvergenceResponse;

/// One request that lets the backend iterate until it converges, then
/// render the final assignment and report the iteration count.
pub(crate) async fn run_to_convergence(shared: &Shared) -> Result<ConvergenceResponse> {
    let data = shared.initialized_data()?;
    let response = shared
        .service
        .run_to_convergence(&data)
        .await
        .map_err(|e| {
            warn!(error = %e, "run to convergence failed");
            Error::from(e)
        })?;

    info!(iteration = response.iteration, "converged");
    let mut state = shared.state.lock();
    state.centroids = response.centroids.clone();
    state.labels = response.labels.clone();
    shared.render_state(&state);
    shared.notify(Notice::ConvergedIn {
        iterations: response.iteration,
    });
    Ok(response)
}
