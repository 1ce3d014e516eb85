// src/prompt/tests/mod.rs
//! Tests for prompt resolution and rendering
