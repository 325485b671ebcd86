use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::{SessionState, Shared};
use crate::wire::StepResponse;

/// Ask the backend for one iteration and render what it returns.
///
/// The backend keeps the current centroids between calls; only the dataset
/// is sent. A failed call renders nothing and leaves the state untouched.
pub(crate) async fn step(shared: &Shared) -> Result<StepResponse> {
    let data = shared.initialized_data()?;
    let response = shared.service.step(&data).await.map_err(|e| {
        warn!(error = %e, "step failed");
        Error::from(e)
    })?;

    let mut state = shared.state.lock();
    apply(shared, &mut state, &response);
    Ok(response)
}

/// Store a step result and render it, converged or not.
pub(crate) fn apply(shared: &Shared, state: &mut SessionState, response: &StepResponse) {
    debug!(
        converged = response.converged,
        iteration = ?response.iteration,
        "step applied"
    );
    state.centroids = response.centroids.clone();
    state.labels = response.labels.clone();
    shared.render_state(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ServiceError;
    use crate::point::Point;
    use crate::session::tests::session_with;
    use crate::wire::InitializeResponse;

    #[tokio::test]
    async fn test_not_initialized_sends_nothing() {
        let (mut session, service, sink) = session_with(Config::default());
        session.generate();
        let frames = sink.frame_count();

        assert_eq!(session.step().await, Err(Error::NotInitialized));
        assert!(service.calls().is_empty());
        assert_eq!(sink.frame_count(), frames);
    }

    #[tokio::test]
    async fn test_converged_step_still_renders() {
        let (mut session, service, sink) = session_with(Config::default());
        session.generate();
        service.push_initialize(Ok(InitializeResponse {
            centroids: vec![Point::new(1.0, 1.0)],
            labels: None,
        }));
        session.initialize().await.unwrap();
        service.push_step(Ok(StepResponse {
            centroids: vec![Point::new(2.0, 2.0)],
            labels: vec![0; 100],
            converged: true,
            iteration: Some(3),
        }));

        let response = session.step().await.unwrap();
        assert!(response.converged);

        let frame = sink.last_frame().unwrap();
        assert_eq!(frame.centroids, vec![Point::new(2.0, 2.0)]);
        assert_eq!(frame.labels.len(), 100);
        assert_eq!(session.state().labels.len(), 100);
    }

    #[tokio::test]
    async fn test_rejected_step_changes_nothing() {
        let (mut session, service, sink) = session_with(Config::default());
        session.generate();
        service.push_initialize(Ok(InitializeResponse {
            centroids: vec![Point::new(1.0, 1.0), Point::new(5.0, 5.0)],
            labels: None,
        }));
        session.initialize().await.unwrap();
        service.push_step(Err(ServiceError::Status {
            status: 400,
            message: "KMeans is not initialized".into(),
        }));

        let before = session.state();
        let frames = sink.frame_count();
        assert!(session.step().await.is_err());

        let after = session.state();
        assert_eq!(sink.frame_count(), frames);
        assert_eq!(after.centroids, before.centroids);
        assert_eq!(after.labels, before.labels);
        assert!(after.initialized);
    }
}
