pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod sim;
pub mod trace;
pub mod workload;

pub use config::{EngineConfig, SimulationRequest};
pub use error::{InvariantViolation, PolicyConfigurationError, RunError, ValidationError};
pub use metrics::{aggregate, Metrics, ProcessMetrics};
pub use orchestrator::{run_all, simulate, ResultSet, RunResult, SummaryRow};
pub use scheduler::{Algorithm, Scheduler};
pub use sim::{run_algorithm, run_scheduler, Sim};
pub use trace::{Interval, Subject, Trace};
pub use workload::{validate, ProcessSpec, Workload};
