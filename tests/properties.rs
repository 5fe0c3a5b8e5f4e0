//! Coverage, conservation and determinism over seeded generated workloads.

use cpu_sched_sim::{
    config::{MlfqConfig, Promotion},
    run_algorithm, validate,
    workload::{generate, ArrivalPattern, GeneratorConfig},
    Algorithm, EngineConfig, ProcessSpec, RunResult, Subject, Workload,
};
use rustc_hash::FxHashMap;

const PATTERNS: [ArrivalPattern; 4] = [
    ArrivalPattern::Random,
    ArrivalPattern::Clustered,
    ArrivalPattern::Spaced,
    ArrivalPattern::Bernoulli,
];

fn workloads() -> Vec<(Vec<ProcessSpec>, i64)> {
    let mut out = Vec::new();
    for (i, pattern) in PATTERNS.into_iter().enumerate() {
        for seed in 0..4u64 {
            let mut specs = generate(&GeneratorConfig {
                count: 12,
                pattern,
                burst: 1..=9,
                seed: seed * 31 + i as u64,
                ..Default::default()
            })
            .unwrap();
            for (n, spec) in specs.iter_mut().enumerate() {
                spec.queue_level = (n % 3) as i64;
            }
            for context_switch in [0, 1, 2] {
                out.push((specs.clone(), context_switch));
            }
        }
    }
    out
}

fn configs() -> [EngineConfig; 2] {
    [
        EngineConfig::default(),
        EngineConfig {
            mlfq: MlfqConfig {
                preempt_on_arrival: true,
                promotion: Promotion::Boost { period: 7 },
                ..Default::default()
            },
            ..Default::default()
        },
    ]
}

fn for_every_run(mut check: impl FnMut(Algorithm, &Workload, &RunResult)) {
    for (specs, context_switch) in workloads() {
        let workload = validate(&specs, context_switch, Some(3)).unwrap();
        for config in configs() {
            for algorithm in Algorithm::ALL {
                let result = run_algorithm(algorithm, &workload, &config)
                    .unwrap_or_else(|err| panic!("{algorithm}: {err}"));
                check(algorithm, &workload, &result);
            }
        }
    }
}

#[test_log::test]
fn traces_cover_zero_to_total_time() {
    for_every_run(|algorithm, _, result| {
        let intervals = result.trace.intervals();
        let mut expected = 0;
        for interval in intervals {
            assert_eq!(interval.start, expected, "{algorithm}");
            assert!(interval.end > interval.start, "{algorithm}");
            expected = interval.end;
        }
        assert_eq!(expected, result.metrics.total_time, "{algorithm}");
        assert!(result.metrics.total_time >= 1);
    });
}

#[test_log::test]
fn intervals_are_coalesced() {
    for_every_run(|algorithm, _, result| {
        for pair in result.trace.intervals().windows(2) {
            assert_ne!(pair[0].subject_id, pair[1].subject_id, "{algorithm}");
        }
    });
}

#[test_log::test]
fn busy_ticks_equal_total_burst() {
    for_every_run(|algorithm, workload, result| {
        let mut ran: FxHashMap<&str, u64> = FxHashMap::default();
        for interval in result.trace.intervals() {
            if let Subject::Process(id) = &interval.subject_id {
                *ran.entry(id.as_str()).or_default() += interval.len();
            }
        }
        for process in workload.processes() {
            assert_eq!(ran[process.id.as_str()], process.burst, "{algorithm}");
        }
        assert_eq!(result.metrics.busy_time, workload.total_burst(), "{algorithm}");
        assert_eq!(
            result.metrics.busy_time + result.metrics.idle_time + result.metrics.switch_time,
            result.metrics.total_time,
            "{algorithm}"
        );
    });
}

#[test_log::test]
fn no_process_runs_before_arrival_or_finishes_early() {
    for_every_run(|algorithm, workload, result| {
        for (process, metrics) in workload.processes().iter().zip(&result.per_process) {
            assert_eq!(process.id, metrics.id);
            assert!(metrics.first_start >= process.arrival, "{algorithm}");
            assert!(
                metrics.completion >= process.arrival + process.burst,
                "{algorithm}"
            );
            assert_eq!(metrics.turnaround, metrics.waiting + process.burst);
        }
    });
}

#[test_log::test]
fn switch_intervals_match_cost() {
    for_every_run(|algorithm, workload, result| {
        let switches: Vec<_> = result
            .trace
            .intervals()
            .iter()
            .filter(|i| i.subject_id == Subject::Switch)
            .collect();
        assert_eq!(switches.len() as u64, result.metrics.context_switches);
        for switch in switches {
            assert_eq!(switch.len(), workload.context_switch(), "{algorithm}");
        }
    });
}

#[test_log::test]
fn non_preemptive_policies_run_each_process_once() {
    for_every_run(|algorithm, workload, result| {
        if algorithm.is_preemptive() {
            return;
        }
        let process_intervals = result
            .trace
            .intervals()
            .iter()
            .filter(|i| i.subject_id.is_process())
            .count();
        assert_eq!(process_intervals, workload.len(), "{algorithm}");
    });
}

#[test_log::test]
fn runs_are_deterministic() {
    for (specs, context_switch) in workloads().into_iter().step_by(5) {
        let workload = validate(&specs, context_switch, Some(2)).unwrap();
        for config in configs() {
            for algorithm in Algorithm::ALL {
                let first = run_algorithm(algorithm, &workload, &config).unwrap();
                let second = run_algorithm(algorithm, &workload, &config).unwrap();
                assert_eq!(
                    serde_json::to_string(&first).unwrap(),
                    serde_json::to_string(&second).unwrap(),
                    "{algorithm}"
                );
            }
        }
    }
}
