//! Test Module
//!
//! Test suite for the hallucination detector.
//!
//! ## Test Categories
//! - `actor_tests`: Content script and background coordinator behavior
//! - `popup_tests`: Toggle broadcast, persistence and health checks
//! - `chaos_test`: Overlapping analyses and contexts disappearing mid-flight
//! - `integration_tests`: Full workflows against a mocked detection service

pub mod integration_tests;
