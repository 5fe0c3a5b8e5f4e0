use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Ticks;
use crate::error::{PolicyConfigurationError, RequestError};
use crate::scheduler::Algorithm;
use crate::workload::ProcessSpec;

pub const DEFAULT_LEVELS: usize = 3;

/// How MLFQ tasks regain priority after demotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Promotion {
    /// Demotion only.
    #[default]
    None,
    /// Every `period` ticks every task returns to level 0.
    Boost { period: Ticks },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlfqConfig {
    pub levels: usize,
    /// Per-level quanta. Defaults to `time_quantum << level`.
    pub quanta: Option<Vec<Ticks>>,
    /// Preempt a running task as soon as a higher level has work.
    pub preempt_on_arrival: bool,
    pub promotion: Promotion,
}

impl Default for MlfqConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            quanta: None,
            preempt_on_arrival: false,
            promotion: Promotion::None,
        }
    }
}

impl MlfqConfig {
    /// Resolves the quantum of every level.
    ///
    /// An explicit list shorter than `levels` is padded with its last value and a
    /// longer one is truncated. Without a list, level `n` gets `time_quantum << n`.
    pub fn resolve_quanta(
        &self,
        time_quantum: Option<Ticks>,
    ) -> Result<Vec<Ticks>, PolicyConfigurationError> {
        let algorithm = Algorithm::Mlfq;
        if self.levels == 0 {
            return Err(PolicyConfigurationError::InvalidLevelCount {
                algorithm,
                levels: self.levels,
            });
        }
        if let Promotion::Boost { period: 0 } = self.promotion {
            return Err(PolicyConfigurationError::ZeroBoostPeriod { algorithm });
        }

        let quanta: Vec<Ticks> = match &self.quanta {
            Some(explicit) => {
                let last = *explicit
                    .last()
                    .ok_or(PolicyConfigurationError::EmptyQuanta { algorithm })?;
                explicit
                    .iter()
                    .copied()
                    .chain(std::iter::repeat(last))
                    .take(self.levels)
                    .collect()
            }
            None => {
                let base = time_quantum
                    .ok_or(PolicyConfigurationError::MissingTimeQuantum { algorithm })?;
                (0..self.levels)
                    .map(|level| {
                        let factor = u32::try_from(level)
                            .ok()
                            .and_then(|shift| 1u64.checked_shl(shift))
                            .unwrap_or(Ticks::MAX);
                        base.saturating_mul(factor)
                    })
                    .collect()
            }
        };

        if let Some(level) = quanta.iter().position(|q| *q == 0) {
            return Err(PolicyConfigurationError::ZeroQuantum { algorithm, level });
        }
        Ok(quanta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlqConfig {
    pub levels: usize,
}

impl Default for MlqConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
        }
    }
}

/// Engine parameters as supplied by the caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub context_switch: i64,
    pub time_quantum: Option<i64>,
    pub mlfq: MlfqConfig,
    pub mlq: MlqConfig,
}

/// Everything one engine call needs: the workload, the algorithms, the parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub processes: Vec<ProcessSpec>,
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    #[serde(flatten)]
    pub config: EngineConfig,
}

impl SimulationRequest {
    /// Loads a request from a `.yaml`/`.yml` file, or JSON for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        load(path.as_ref())
    }
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        load(path.as_ref())
    }
}

fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RequestError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RequestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&raw).map_err(|source| RequestError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&raw).map_err(|source| RequestError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
