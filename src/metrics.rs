//! Metrics Aggregator: per-process and aggregate statistics derived from a trace.

use average::{Estimate, Mean};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core::Ticks;
use crate::error::InvariantViolation;
use crate::trace::{Subject, Trace};
use crate::workload::Workload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub id: String,
    pub arrival: Ticks,
    pub burst: Ticks,
    pub priority: u64,
    pub first_start: Ticks,
    pub completion: Ticks,
    pub turnaround: Ticks,
    pub waiting: Ticks,
    pub response: Ticks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub avg_turnaround: f64,
    pub avg_waiting: f64,
    pub avg_response: f64,
    /// Process ticks over total ticks; switch ticks count as not busy.
    pub cpu_utilization: f64,
    /// Completed processes per tick.
    pub throughput: f64,
    pub total_time: Ticks,
    pub busy_time: Ticks,
    pub idle_time: Ticks,
    pub switch_time: Ticks,
    pub context_switches: u64,
}

#[derive(Default)]
struct Observed {
    ran: Ticks,
    first_start: Option<Ticks>,
    last_end: Ticks,
}

fn mean(values: impl Iterator<Item = Ticks>) -> f64 {
    values.map(|v| v as f64).collect::<Mean>().estimate()
}

/// Derives metrics from `trace` alone. Completion of a process is the end of
/// its last interval.
pub fn aggregate(
    trace: &Trace,
    workload: &Workload,
) -> Result<(Metrics, Vec<ProcessMetrics>), InvariantViolation> {
    let mut observed: FxHashMap<&str, Observed> = workload
        .processes()
        .iter()
        .map(|p| (p.id.as_str(), Observed::default()))
        .collect();

    let mut idle_time = 0;
    let mut switch_time = 0;
    let mut context_switches = 0;
    for interval in trace.intervals() {
        match &interval.subject_id {
            Subject::Idle => idle_time += interval.len(),
            Subject::Switch => {
                switch_time += interval.len();
                context_switches += 1;
            }
            Subject::Process(id) => {
                let entry = observed
                    .get_mut(id.as_str())
                    .ok_or_else(|| InvariantViolation::UnknownSubject { id: id.clone() })?;
                entry.ran += interval.len();
                entry.first_start.get_or_insert(interval.start);
                entry.last_end = interval.end;
            }
        }
    }

    let mut per_process = Vec::with_capacity(workload.len());
    for process in workload.processes() {
        let seen = &observed[process.id.as_str()];
        if seen.ran != process.burst {
            return Err(InvariantViolation::BurstMismatch {
                id: process.id.clone(),
                ran: seen.ran,
                burst: process.burst,
            });
        }
        let negative = |metric| InvariantViolation::NegativeMetric {
            id: process.id.clone(),
            metric,
        };

        // ran == burst >= 1, so a first start exists
        let first_start = seen.first_start.unwrap_or(seen.last_end);
        let completion = seen.last_end;
        let turnaround = completion
            .checked_sub(process.arrival)
            .ok_or_else(|| negative("turnaround"))?;
        let waiting = turnaround
            .checked_sub(process.burst)
            .ok_or_else(|| negative("waiting"))?;
        let response = first_start
            .checked_sub(process.arrival)
            .ok_or_else(|| negative("response"))?;

        per_process.push(ProcessMetrics {
            id: process.id.clone(),
            arrival: process.arrival,
            burst: process.burst,
            priority: process.priority,
            first_start,
            completion,
            turnaround,
            waiting,
            response,
        });
    }

    let total_time = trace.total_time();
    let busy_time = trace.busy_ticks();
    let metrics = Metrics {
        avg_turnaround: mean(per_process.iter().map(|p| p.turnaround)),
        avg_waiting: mean(per_process.iter().map(|p| p.waiting)),
        avg_response: mean(per_process.iter().map(|p| p.response)),
        cpu_utilization: busy_time as f64 / total_time as f64,
        throughput: workload.len() as f64 / total_time as f64,
        total_time,
        busy_time,
        idle_time,
        switch_time,
        context_switches,
    };

    Ok((metrics, per_process))
}
