//! JSON bodies exchanged with the clustering backend.
//!
//! | Endpoint | Request | Response |
//! |---|---|---|
//! | `/initialize_kmeans` | [`InitializeRequest`] | [`InitializeResponse`] |
//! | `/step_kmeans` | [`DataRequest`] | [`StepResponse`] |
//! | `/run_to_convergence` | [`DataRequest`] | [`ConvergenceResponse`] |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::point::Point;

pub const INITIALIZE_PATH: &str = "/initialize_kmeans";
pub const STEP_PATH: &str = "/step_kmeans";
pub const CONVERGE_PATH: &str = "/run_to_convergence";

/// How the backend picks its starting centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InitMethod {
    #[default]
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "kmeans++")]
    KMeansPlusPlus,
    #[serde(rename = "farthest")]
    Farthest,
    #[serde(rename = "manual")]
    Manual,
}

impl InitMethod {
    pub const ALL: [InitMethod; 4] = [
        InitMethod::Random,
        InitMethod::KMeansPlusPlus,
        InitMethod::Farthest,
        InitMethod::Manual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::KMeansPlusPlus => "kmeans++",
            Self::Farthest => "farthest",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InitMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown init method '{}' (expected one of: random, kmeans++, farthest, manual)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest<'a> {
    pub data: &'a [Point],
    pub init_method: InitMethod,
    pub k: usize,
    /// `null` unless `init_method` is manual.
    pub manual_centroids: Option<&'a [Point]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRequest<'a> {
    pub data: &'a [Point],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub centroids: Vec<Point>,
    #[serde(default)]
    pub labels: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    pub centroids: Vec<Point>,
    pub labels: Vec<usize>,
    pub converged: bool,
    #[serde(default)]
    pub iteration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResponse {
    pub centroids: Vec<Point>,
    pub labels: Vec<usize>,
    pub iteration: u64,
    #[serde(default)]
    pub converged: Option<bool>,
}

/// Body the backend sends with a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
