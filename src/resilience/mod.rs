// src/resilience/mod.rs
//! Per-provider circuit breaking for the fallback chain.

pub mod circuit_breaker;

#[cfg(test)]
mod tests;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
