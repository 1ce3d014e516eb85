// src/limiter/tests/mod.rs
//! Tests for the per-tier limiter and the tier registry

mod rate_limiter_tests;
