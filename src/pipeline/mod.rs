//! End-to-end job: partition, classify, extract, aggregate.

pub mod runner;

pub use runner::Pipeline;
