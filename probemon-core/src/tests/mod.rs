//! Behaviour-driven scenarios and property tests for the core crate.

mod dedup_cache_steps;
