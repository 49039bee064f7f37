//! Error types for scorewatch.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("negative score: {0}")] NegativeScore(i64),
    #[error("non-numeric score: {0:?}")] NonNumeric(String),
    #[error("empty username")] EmptyUsername,
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)] Score(#[from] ScoreError),
    #[error("storage: {0}")] Storage(String),
    #[error("sampler: {0}")] Sampler(String),
    #[error("config: {0}")] Config(String),
    #[error(transparent)] Io(#[from] std::io::Error),
}
