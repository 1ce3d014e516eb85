// src/providers/tests/mod.rs
//! Tests for the providers and the fallback chain

mod chain_tests;
