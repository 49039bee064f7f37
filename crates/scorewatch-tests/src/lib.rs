//! Property and end-to-end test suite for scorewatch.
//!
//! Integration tests drive the score store and the tracker through random
//! score streams and full daemon-style runs, checking the alert rules,
//! retention caps, and the age-based prune window.

pub mod helpers;
