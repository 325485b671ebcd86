use std::ops::Range;
use std::time::Duration;

use crate::wire::InitMethod;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Period between auto-step ticks.
    pub tick_period: Duration,
    pub dataset_size: usize,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    /// Target `k` for non-manual methods and the pick limit in manual mode.
    pub cluster_count: usize,
    pub init_method: InitMethod,
    /// Chain a successful initialize straight into run-to-convergence.
    pub run_immediately: bool,
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            tick_period: DEFAULT_TICK_PERIOD,
            dataset_size: 100,
            x_range: 0.0..10.0,
            y_range: 0.0..10.0,
            cluster_count: 3,
            init_method: InitMethod::Random,
            run_immediately: false,
            seed: None,
        }
    }
}

impl Config {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn with_cluster_count(mut self, k: usize) -> Self {
        self.cluster_count = k;
        self
    }

    pub fn with_init_method(mut self, method: InitMethod) -> Self {
        self.init_method = method;
        self
    }

    pub fn with_run_immediately(mut self, yes: bool) -> Self {
        self.run_immediately = yes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
