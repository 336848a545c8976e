use thiserror::Error;

/// Input rejected before it reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("empty expression")]
    Empty,

    /// Lengths are counted in characters.
    #[error("expression has {length} characters, the limit is {limit}")]
    TooLong { length: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: String, value: String },
}
