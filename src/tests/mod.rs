// src/tests/mod.rs
//! End-to-end tests through the interpretation service
