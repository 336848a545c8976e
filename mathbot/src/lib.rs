//! Interpretation of informal math text: normalization, classification,
//! dispatch to the algebra engine and formatting of the answer.

pub mod callback;
pub mod catalog;
pub mod classify;
mod config;
pub mod dispatch;
mod error;
pub mod format;
pub mod normalize;
pub mod symbols;
pub mod variables;

pub use callback::Callback;
pub use catalog::{catalog, Category, Example};
pub use classify::{classify, Classification, ExpressionKind};
pub use config::Config;
pub use dispatch::{dispatch, DispatchOutcome, Value};
pub use error::{ConfigError, InputError};
pub use normalize::normalize;
pub use symbols::{glossary, lookup_symbol, SymbolEntry};

/// Everything the pipeline produced for one input.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub input: String,
    pub normalized: String,
    pub kind: ExpressionKind,
    pub outcome: DispatchOutcome,
}

/// Rejects `raw` when it is longer than `config.max_input_chars`.
pub fn check_length(raw: &str, config: &Config) -> Result<(), InputError> {
    let length = raw.chars().count();
    if length > config.max_input_chars {
        return Err(InputError::TooLong {
            length,
            limit: config.max_input_chars,
        });
    }
    Ok(())
}

/// Runs the whole pipeline on `raw`.
pub fn evaluate(raw: &str, config: &Config) -> Result<Report, InputError> {
    check_length(raw, config)?;
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(InputError::Empty);
    }
    let classification = classify(&normalized);
    let outcome = dispatch(&classification, &normalized, config);
    Ok(Report {
        input: raw.trim().to_owned(),
        normalized,
        kind: classification.kind(),
        outcome,
    })
}

/// The reply text for `raw`. Never fails.
pub fn interpret(raw: &str, config: &Config) -> String {
    match evaluate(raw, config) {
        Ok(report) => format::render(&report, config),
        Err(err) => {
            log::info!("rejected input: {}", err);
            format::input_error(&err)
        }
    }
}
