use std::ops::RangeInclusive;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::ProcessSpec;
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalPattern {
    /// Gaps drawn from `arrival_gap`.
    #[default]
    Random,
    /// Gaps of 0 to 2 ticks.
    Clustered,
    /// Gaps of 3 to 7 ticks.
    Spaced,
    /// One Bernoulli trial per tick; bursts are either the short or the long bound.
    Bernoulli,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub count: usize,
    pub pattern: ArrivalPattern,
    pub burst: RangeInclusive<i64>,
    pub arrival_gap: RangeInclusive<i64>,
    pub priority: RangeInclusive<i64>,
    pub p_arrival: f64,
    pub p_short: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 10,
            pattern: ArrivalPattern::Random,
            burst: 2..=20,
            arrival_gap: 0..=5,
            priority: 1..=5,
            p_arrival: 0.3,
            p_short: 0.3,
            seed: 0,
        }
    }
}

impl GeneratorConfig {
    fn check_ranges(&self) -> Result<(), ValidationError> {
        let ranges = [
            ("burst", &self.burst, 1),
            ("arrival_gap", &self.arrival_gap, 0),
            ("priority", &self.priority, 1),
        ];
        for (field, range, min) in ranges {
            if range.is_empty() || *range.start() < min {
                return Err(ValidationError::InvalidRange {
                    field,
                    start: *range.start(),
                    end: *range.end(),
                });
            }
        }
        // Comparisons are false for NaN, so it lands in the error arm
        if !(self.p_arrival > 0.0 && self.p_arrival <= 1.0) {
            return Err(ValidationError::InvalidProbability {
                field: "p_arrival",
                range: "(0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.p_short) {
            return Err(ValidationError::InvalidProbability {
                field: "p_short",
                range: "[0, 1]",
            });
        }
        Ok(())
    }
}

/// Builds a reproducible workload of `count` processes named `P1..Pn`.
pub fn generate(config: &GeneratorConfig) -> Result<Vec<ProcessSpec>, ValidationError> {
    config.check_ranges()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut processes = Vec::with_capacity(config.count);

    match config.pattern {
        ArrivalPattern::Bernoulli => bernoulli(&mut rng, config, &mut processes),
        pattern => {
            let gaps = match pattern {
                ArrivalPattern::Clustered => 0..=2,
                ArrivalPattern::Spaced => 3..=7,
                _ => config.arrival_gap.clone(),
            };
            let mut arrival = 0;
            for i in 1..=config.count {
                arrival += rng.random_range(gaps.clone());
                let burst = rng.random_range(config.burst.clone());
                let priority = rng.random_range(config.priority.clone());
                processes.push(ProcessSpec::new(format!("P{i}"), arrival, burst, priority));
            }
        }
    }

    tracing::debug!(
        count = processes.len(),
        pattern = ?config.pattern,
        seed = config.seed,
        "generated workload"
    );
    Ok(processes)
}

fn bernoulli(rng: &mut StdRng, config: &GeneratorConfig, processes: &mut Vec<ProcessSpec>) {
    let short = *config.burst.start();
    let long = *config.burst.end();

    let mut tick = 0;
    while processes.len() < config.count {
        if rng.random::<f64>() < config.p_arrival {
            let burst = if rng.random::<f64>() < config.p_short {
                short
            } else {
                long
            };
            let priority = rng.random_range(config.priority.clone());
            let id = format!("P{}", processes.len() + 1);
            processes.push(ProcessSpec::new(id, tick, burst, priority));
        }
        tick += 1;
    }
}
