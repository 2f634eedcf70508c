use std::path::PathBuf;

use thiserror::Error;

use crate::engine::SolveStatus;
use crate::types::Category;

/// Problems with the input tables or the configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{table}: line {line}: {message}")]
    Syntax {
        table: String,
        line: usize,
        message: String,
    },
    #[error("{table}: missing column `{column}`")]
    MissingColumn { table: String, column: String },
    #[error("{table}: line {line}: invalid value {value:?} in column `{column}`")]
    InvalidValue {
        table: String,
        line: usize,
        column: String,
        value: String,
    },
    #[error("invalid shelter rule {0:?}, expected `n` or `lo-hi`")]
    InvalidRule(String),
    #[error("article `{0}` appears more than once")]
    DuplicateArticle(String),
    #[error("shelter `{0}` appears more than once")]
    DuplicateShelter(String),
    #[error("article `{article}` has invalid volume {volume}")]
    InvalidVolume { article: String, volume: f64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),
}

/// Why a single shelter produced no allocation. Never fatal to the run.
#[derive(Debug, Error)]
pub enum ShelterError {
    #[error("rule references category `{0}` which has no products")]
    MissingCategory(Category),
    #[error("no rule for category `{0}`")]
    UnruledCategory(Category),
    #[error("no solution found (status: {0})")]
    NoSolution(SolveStatus),
    #[error("solver failure: {0}")]
    Engine(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
