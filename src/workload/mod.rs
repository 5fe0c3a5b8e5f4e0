pub mod generator;
pub mod process;

pub use generator::{generate, ArrivalPattern, GeneratorConfig};
pub use process::{validate, Process, ProcessSpec, Workload};
