//! The clustering backend, seen from the client.
//!
//! The backend owns every piece of algorithmic state once it has been
//! initialized; the client only forwards the dataset and displays whatever
//! comes back.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::point::Point;
use crate::wire::{
    ConvergenceResponse, DataRequest, ErrorBody, InitMethod, InitializeRequest,
    InitializeResponse, StepResponse, CONVERGE_PATH, INITIALIZE_PATH, STEP_PATH,
};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait ClusteringService: Send + Sync {
    async fn initialize(&self, request: &InitializeRequest<'_>) -> ServiceResult<InitializeResponse>;

    async fn step(&self, data: &[Point]) -> ServiceResult<StepResponse>;

    async fn run_to_convergence(&self, data: &[Point]) -> ServiceResult<ConvergenceResponse>;
}

pub struct HttpClusteringService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClusteringService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ServiceResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        decode(status, &bytes).map_err(|e| {
            if let ServiceError::Status { status, message } = &e {
                warn!(%url, status, %message, "service rejected request");
            }
            e
        })
    }
}

/// Turn a finished response into either the expected body or an error.
///
/// A non-success status prefers the message of an `{"error": "..."}` body and
/// falls back to the raw body text.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ServiceResult<T> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
        return Err(ServiceError::Status { status: status.as_u16(), message });
    }
    serde_json::from_slice(body).map_err(|e| ServiceError::Decode(e.to_string()))
}

#[async_trait]
impl ClusteringService for HttpClusteringService {
    async fn initialize(&self, request: &InitializeRequest<'_>) -> ServiceResult<InitializeResponse> {
        self.post(INITIALIZE_PATH, request).await
    }

    async fn step(&self, data: &[Point]) -> ServiceResult<StepResponse> {
        self.post(STEP_PATH, &DataRequest { data }).await
    }

    async fn run_to_convergence(&self, data: &[Point]) -> ServiceResult<ConvergenceResponse> {
        self.post(CONVERGE_PATH, &DataRequest { data }).await
    }
}

/// A request as seen by [`ScriptedService`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize {
        points: usize,
        init_method: InitMethod,
        k: usize,
        manual_centroids: Option<Vec<Point>>,
    },
    Step { points: usize },
    RunToConvergence { points: usize },
}

/// In-memory backend that replays queued responses and logs every request.
/// An endpoint with nothing queued answers with a transport error.
#[derive(Default)]
pub struct ScriptedService {
    initialize: Mutex<VecDeque<ServiceResult<InitializeResponse>>>,
    step: Mutex<VecDeque<ServiceResult<StepResponse>>>,
    converge: Mutex<VecDeque<ServiceResult<ConvergenceResponse>>>,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_initialize(&self, response: ServiceResult<InitializeResponse>) {
        self.initialize.lock().push_back(response);
    }

    pub fn push_step(&self, response: ServiceResult<StepResponse>) {
        self.step.lock().push_back(response);
    }

    pub fn push_converge(&self, response: ServiceResult<ConvergenceResponse>) {
        self.converge.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn step_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Step { .. }))
            .count()
    }

    async fn respond<T: Send>(
        &self,
        queue: &Mutex<VecDeque<ServiceResult<T>>>,
        endpoint: &str,
    ) -> ServiceResult<T> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }
        let next = queue.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(ServiceError::Transport(format!("no scripted response for {}", endpoint)))
        })
    }
}

#[async_trait]
impl ClusteringService for ScriptedService {
    async fn initialize(&self, request: &InitializeRequest<'_>) -> ServiceResult<InitializeResponse> {
        self.calls.lock().push(Call::Initialize {
            points: request.data.len(),
            init_method: request.init_method,
            k: request.k,
            manual_centroids: request.manual_centroids.map(|c| c.to_vec()),
        });
        self.respond(&self.initialize, INITIALIZE_PATH).await
    }

    async fn step(&self, data: &[Point]) -> ServiceResult<StepResponse> {
        self.calls.lock().push(Call::Step { points: data.len() });
        self.respond(&self.step, STEP_PATH).await
    }

    async fn run_to_convergence(&self, data: &[Point]) -> ServiceResult<ConvergenceResponse> {
        self.calls.lock().push(Call::RunToConvergence { points: data.len() });
        self.respond(&self.converge, CONVERGE_PATH).await
    }
}
