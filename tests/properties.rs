//! Property-based tests for the session controllers

use std::future::Future;
use std::sync::Arc;

use kmeans_viz::wire::InitializeResponse;
use kmeans_viz::{
    Call, Config, Error, InitMethod, Point, RecordingSink, ScriptedService, Selection, Session,
};
use proptest::prelude::*;

fn setup(config: Config) -> (Session, Arc<ScriptedService>) {
    let service = Arc::new(ScriptedService::new());
    let session = Session::new(
        config.with_seed(11),
        service.clone(),
        Box::new(RecordingSink::new()),
    );
    (session, service)
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn arb_click() -> impl Strategy<Value = (f64, f64)> {
    (-10.0f64..10.0, -10.0f64..10.0)
}

fn arb_automatic_method() -> impl Strategy<Value = InitMethod> {
    prop_oneof![
        Just(InitMethod::Random),
        Just(InitMethod::KMeansPlusPlus),
        Just(InitMethod::Farthest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: in manual mode at most `k` clicks are kept, in click order,
    /// and every later click is rejected with the limit error
    #[test]
    fn prop_clicks_respect_cap(
        k in 1usize..6,
        clicks in prop::collection::vec(arb_click(), 0..12)
    ) {
        let (mut session, _) = setup(
            Config::default()
                .with_init_method(InitMethod::Manual)
                .with_cluster_count(k),
        );
        session.generate();

        for (i, (x, y)) in clicks.iter().enumerate() {
            let result = session.on_point_clicked(*x, *y);
            if i < k {
                prop_assert_eq!(result, Ok(Selection::Captured { count: i + 1 }));
            } else {
                prop_assert_eq!(result, Err(Error::CentroidLimitReached { k }));
            }
        }

        let kept: Vec<Point> = clicks
            .iter()
            .take(k)
            .map(|&(x, y)| Point::new(x, y))
            .collect();
        let state = session.state();
        prop_assert_eq!(state.selected.points(), &kept[..]);
    }

    /// Property: automatic methods send the cluster count and no picks, and
    /// never fail for lack of picks
    #[test]
    fn prop_automatic_init_ignores_picks(
        method in arb_automatic_method(),
        k in 1usize..8,
        clicks in prop::collection::vec(arb_click(), 0..8)
    ) {
        let (mut session, service) = setup(
            Config::default()
                .with_init_method(InitMethod::Manual)
                .with_cluster_count(k),
        );
        session.generate();
        for (x, y) in &clicks {
            let _ = session.on_point_clicked(*x, *y);
        }
        session.set_init_method(method);
        service.push_initialize(Ok(InitializeResponse {
            centroids: vec![Point::new(0.0, 0.0); k],
            labels: None,
        }));

        let result = block_on(session.initialize());

        prop_assert!(result.is_ok());
        prop_assert_eq!(
            service.calls(),
            vec![Call::Initialize {
                points: 100,
                init_method: method,
                k,
                manual_centroids: None,
            }]
        );
    }

    /// Property: before a successful initialize, step and run to convergence
    /// are rejected without a request reaching the backend
    #[test]
    fn prop_uninitialized_sends_nothing(
        ops in prop::collection::vec(any::<bool>(), 1..10)
    ) {
        let (mut session, service) = setup(Config::default());
        session.generate();

        for single_step in ops {
            let err = block_on(async {
                if single_step {
                    session.step().await.err()
                } else {
                    session.run_to_convergence().await.err()
                }
            });
            prop_assert_eq!(err, Some(Error::NotInitialized));
        }
        prop_assert!(service.calls().is_empty());
        prop_assert!(!session.is_initialized());
    }
}
