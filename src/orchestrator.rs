//! Runs several algorithms against one workload and collects their results in
//! request order.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::config::{EngineConfig, SimulationRequest};
use crate::core::Ticks;
use crate::error::{RunError, ValidationError};
use crate::metrics::{Metrics, ProcessMetrics};
use crate::scheduler::Algorithm;
use crate::sim::run_algorithm;
use crate::trace::Trace;
use crate::workload::{validate, Workload};

/// Trace and metrics of one successful run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub trace: Trace,
    pub metrics: Metrics,
    pub per_process: Vec<ProcessMetrics>,
}

/// One line of the cross-algorithm comparison.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SummaryRow {
    pub algorithm: Algorithm,
    pub avg_waiting: f64,
    pub avg_turnaround: f64,
    pub avg_response: f64,
    pub cpu_utilization: f64,
    pub throughput: f64,
    pub total_time: Ticks,
    pub context_switches: u64,
}

/// Results keyed by algorithm, in the order the algorithms were requested.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<(Algorithm, Result<RunResult, RunError>)>,
}

impl ResultSet {
    pub fn get(&self, algorithm: Algorithm) -> Option<&Result<RunResult, RunError>> {
        self.entries
            .iter()
            .find(|(a, _)| *a == algorithm)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Algorithm, &Result<RunResult, RunError>)> {
        self.entries.iter().map(|(a, result)| (*a, result))
    }

    pub fn algorithms(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.entries.iter().map(|(a, _)| *a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        self.iter()
            .filter_map(|(algorithm, result)| {
                let m = &result.as_ref().ok()?.metrics;
                Some(SummaryRow {
                    algorithm,
                    avg_waiting: m.avg_waiting,
                    avg_turnaround: m.avg_turnaround,
                    avg_response: m.avg_response,
                    cpu_utilization: m.cpu_utilization,
                    throughput: m.throughput,
                    total_time: m.total_time,
                    context_switches: m.context_switches,
                })
            })
            .collect()
    }
}

#[derive(serde::Serialize)]
struct ErrorEntry {
    error: String,
}

// An ordered map: algorithm -> run result, or {"error": message}
impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (algorithm, result) in &self.entries {
            match result {
                Ok(run) => map.serialize_entry(algorithm.as_str(), run)?,
                Err(err) => map.serialize_entry(
                    algorithm.as_str(),
                    &ErrorEntry {
                        error: err.to_string(),
                    },
                )?,
            }
        }
        map.end()
    }
}

fn log_outcome(algorithm: Algorithm, result: &Result<RunResult, RunError>) {
    match result {
        Ok(run) => tracing::info!(
            %algorithm,
            total_time = run.metrics.total_time,
            avg_waiting = run.metrics.avg_waiting,
            context_switches = run.metrics.context_switches,
            "algorithm finished"
        ),
        Err(RunError::Configuration(err)) => {
            tracing::warn!(%algorithm, error = %err, "algorithm not run")
        }
        Err(RunError::Invariant(err)) => {
            tracing::error!(%algorithm, error = %err, "run violated an engine invariant")
        }
    }
}

/// Runs every requested algorithm over `workload`, one thread per algorithm.
///
/// A repeated algorithm runs once, at its first position. A failing run is
/// reported under its own key and never affects the others.
pub fn run_all(workload: &Workload, algorithms: &[Algorithm], config: &EngineConfig) -> ResultSet {
    let mut unique: Vec<Algorithm> = Vec::with_capacity(algorithms.len());
    for &algorithm in algorithms {
        if !unique.contains(&algorithm) {
            unique.push(algorithm);
        }
    }

    let entries: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = unique
            .iter()
            .map(|&algorithm| {
                (
                    algorithm,
                    scope.spawn(move || run_algorithm(algorithm, workload, config)),
                )
            })
            .collect();

        handles
            .into_iter()
            .map(|(algorithm, handle)| {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                };
                log_outcome(algorithm, &result);
                (algorithm, result)
            })
            .collect()
    });

    ResultSet { entries }
}

/// Validates a request and runs it. Only validation failures abort the whole call.
pub fn simulate(request: &SimulationRequest) -> Result<ResultSet, ValidationError> {
    if request.algorithms.is_empty() {
        return Err(ValidationError::NoAlgorithms);
    }
    let workload = validate(
        &request.processes,
        request.config.context_switch,
        request.config.time_quantum,
    )?;
    tracing::info!(
        processes = workload.len(),
        algorithms = request.algorithms.len(),
        "simulating"
    );
    Ok(run_all(&workload, &request.algorithms, &request.config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyConfigurationError;
    use crate::workload::ProcessSpec;
    use similar_asserts::assert_eq;

    fn request(algorithms: Vec<Algorithm>) -> SimulationRequest {
        SimulationRequest {
            processes: vec![
                ProcessSpec::new("P1", 0, 5, 2),
                ProcessSpec::new("P2", 1, 3, 1),
            ],
            algorithms,
            config: EngineConfig::default(),
        }
    }

    #[test_log::test]
    fn keeps_request_order_and_drops_duplicates() {
        let results = simulate(&request(vec![
            Algorithm::Sjf,
            Algorithm::Fcfs,
            Algorithm::Sjf,
            Algorithm::Priority,
        ]))
        .unwrap();

        assert_eq!(
            results.algorithms().collect::<Vec<_>>(),
            vec![Algorithm::Sjf, Algorithm::Fcfs, Algorithm::Priority]
        );
    }

    #[test_log::test]
    fn missing_quantum_only_fails_its_own_entry() {
        let results = simulate(&request(vec![Algorithm::Rr, Algorithm::Fcfs])).unwrap();

        assert_eq!(
            results.get(Algorithm::Rr).unwrap().as_ref().unwrap_err(),
            &RunError::Configuration(PolicyConfigurationError::MissingTimeQuantum {
                algorithm: Algorithm::Rr
            })
        );
        assert!(results.get(Algorithm::Fcfs).unwrap().is_ok());
        assert_eq!(results.summary().len(), 1);
    }

    #[test_log::test]
    fn empty_algorithm_list_is_a_validation_error() {
        assert_eq!(
            simulate(&request(vec![])).unwrap_err(),
            ValidationError::NoAlgorithms
        );
    }

    #[test_log::test]
    fn serializes_as_ordered_map_with_error_entries() {
        let results = simulate(&request(vec![Algorithm::Mlfq, Algorithm::Fcfs])).unwrap();
        let json = serde_json::to_value(&results).unwrap();

        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            json["MLFQ"]["error"],
            serde_json::json!("MLFQ requires `time_quantum`")
        );
        assert_eq!(json["FCFS"]["metrics"]["total_time"], serde_json::json!(8));
        assert_eq!(json["FCFS"]["perProcess"][1]["waiting"], serde_json::json!(4));
        assert_eq!(json["FCFS"]["trace"][0]["subjectId"], serde_json::json!("P1"));
    }

    #[test_log::test]
    fn summary_rows_follow_request_order() {
        let results = simulate(&request(vec![Algorithm::Priority, Algorithm::Fcfs])).unwrap();
        let summary = results.summary();

        assert_eq!(summary[0].algorithm, Algorithm::Priority);
        assert_eq!(summary[1].algorithm, Algorithm::Fcfs);
        assert_eq!(summary[1].avg_waiting, 2.0);
    }
}
