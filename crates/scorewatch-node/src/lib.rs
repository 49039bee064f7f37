//! # scorewatch-node: RocksDB persistence, configuration, and the tracking loop.
//!
//! Composes the scorewatch core into a running tracker:
//! - [`storage::RocksStore`]: persistent user records backed by RocksDB
//! - [`tracker::Tracker`]: store + persistence + notifier, and the timer loop
//! - [`sampler::ScoreSampler`]: replaceable source of score readings
//! - [`notify`]: notification routing and delivery
//! - [`config::WatchConfig`]: layered configuration

pub mod config;
pub mod notify;
pub mod sampler;
pub mod storage;
pub mod tracker;

pub use config::WatchConfig;
pub use notify::NotifyPolicy;
pub use sampler::ScoreSampler;
pub use storage::RocksStore;
pub use tracker::Tracker;
