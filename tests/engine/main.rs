//! Integration tests for Layer 2: Engine
//!
//! Tests for variables, patterns, frames, and synchronization registration.

mod patterns;
