use tracing::{info, warn};

use crate::converge;
use crate::error::{Error, Result};
use crate::point::Point;
use crate::session::Shared;
use crate::wire::{InitMethod, InitializeRequest};

/// Validate the chosen method, ask the backend for starting centroids and
/// render them over the dataset.
///
/// In manual mode the picks decide `k`; every other method sends the
/// cluster-count input and never looks at the picks. With `run_immediately`
/// a successful initialize continues into a run to convergence.
pub(crate) async fn initialize(shared: &Shared, run_immediately: bool) -> Result<Vec<Point>> {
    let (data, init_method, k, manual_centroids) = {
        let state = shared.state.lock();
        let (k, manual_centroids) = match state.init_method {
            InitMethod::Manual => {
                if state.selected.is_empty() {
                    return Err(Error::InsufficientCentroids);
                }
                (state.selected.len(), Some(state.selected.points().to_vec()))
            }
            InitMethod::Random | InitMethod::KMeansPlusPlus | InitMethod::Farthest => {
                (state.cluster_count, None)
            }
        };
        (state.dataset.points().to_vec(), state.init_method, k, manual_centroids)
    };

    info!(%init_method, k, points = data.len(), "initializing");
    let request = InitializeRequest {
        data: &data,
        init_method,
        k,
        manual_centroids: manual_centroids.as_deref(),
    };
    let response = shared.service.initialize(&request).await.map_err(|e| {
        warn!(error = %e, "initialize failed");
        Error::from(e)
    })?;

    let centroids = {
        let mut state = shared.state.lock();
        state.initialized = true;
        state.session_k = Some(k);
        state.centroids = response.centroids;
        state.labels.clear();
        shared.render_state(&state);
        state.centroids.clone()
    };

    if run_immediately {
        converge::run_to_convergence(shared).await?;
    }
    Ok(centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ServiceError;
    use crate::service::Call;
    use crate::session::tests::session_with;
    use crate::wire::{ConvergenceResponse, InitializeResponse};

    fn centroids(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f64, i as f64)).collect()
    }

    #[tokio::test]
    async fn test_non_manual_methods_ignore_picks() {
        for method in [InitMethod::Random, InitMethod::KMeansPlusPlus, InitMethod::Farthest] {
            let (mut session, service, _) = session_with(
                Config::default()
                    .with_init_method(InitMethod::Manual)
                    .with_cluster_count(4),
            );
            session.generate();
            session.on_point_clicked(1.0, 1.0).unwrap();
            session.on_point_clicked(2.0, 2.0).unwrap();
            session.set_init_method(method);
            service.push_initialize(Ok(InitializeResponse { centroids: centroids(4), labels: None }));

            session.initialize().await.unwrap();

            assert_eq!(
                service.calls(),
                vec![Call::Initialize {
                    points: 100,
                    init_method: method,
                    k: 4,
                    manual_centroids: None,
                }]
            );
            assert_eq!(session.state().session_k, Some(4));
            assert_eq!(session.state().selected.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_manual_without_picks_sends_nothing() {
        let (mut session, service, sink) =
            session_with(Config::default().with_init_method(InitMethod::Manual));
        session.generate();
        let frames = sink.frame_count();

        assert_eq!(session.initialize().await, Err(Error::InsufficientCentroids));
        assert!(service.calls().is_empty());
        assert!(!session.is_initialized());
        assert_eq!(sink.frame_count(), frames);
    }

    #[tokio::test]
    async fn test_manual_picks_become_k() {
        let (mut session, service, _) = session_with(
            Config::default()
                .with_init_method(InitMethod::Manual)
                .with_cluster_count(5),
        );
        session.generate();
        session.on_point_clicked(1.0, 1.0).unwrap();
        session.on_point_clicked(2.0, 2.0).unwrap();
        service.push_initialize(Ok(InitializeResponse { centroids: centroids(2), labels: None }));

        session.initialize().await.unwrap();

        match &service.calls()[0] {
            Call::Initialize { k, manual_centroids, .. } => {
                assert_eq!(*k, 2);
                assert_eq!(
                    manual_centroids.as_deref(),
                    Some(&[Point::new(1.0, 1.0), Point::new(2.0, 2.0)][..])
                );
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_leaves_state() {
        let (mut session, service, sink) = session_with(Config::default());
        session.generate();
        let frames = sink.frame_count();
        service.push_initialize(Err(ServiceError::Status {
            status: 500,
            message: "boom".into(),
        }));

        let err = session.initialize().await.unwrap_err();
        assert!(matches!(err, Error::Service(ServiceError::Status { status: 500, .. })));
        assert!(!session.is_initialized());
        assert_eq!(sink.frame_count(), frames);
    }

    #[tokio::test]
    async fn test_run_immediately_chains_convergence() {
        let (mut session, service, sink) =
            session_with(Config::default().with_run_immediately(true));
        session.generate();
        service.push_initialize(Ok(InitializeResponse { centroids: centroids(3), labels: None }));
        service.push_converge(Ok(ConvergenceResponse {
            centroids: centroids(3),
            labels: vec![0; 100],
            iteration: 6,
            converged: Some(true),
        }));

        session.initialize().await.unwrap();

        assert_eq!(service.calls().len(), 2);
        assert!(matches!(service.calls()[1], Call::RunToConvergence { points: 100 }));
        let frames = sink.frames();
        assert!(frames[frames.len() - 2].labels.is_empty());
        assert_eq!(frames[frames.len() - 1].labels.len(), 100);
    }
}
