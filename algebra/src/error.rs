//! Errors reported by the algebra engine.

use thiserror::Error as ThisError;

use crate::{
    parser::{self, Full},
    Identifier,
};

/// Everything that can go wrong while parsing or computing.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// The text is not a valid expression.
    #[error("invalid expression: {}", describe(.0))]
    Parse(Vec<parser::Error<Full>>),

    /// Parentheses or function calls are nested beyond the parser limit.
    #[error("expression is nested too deeply")]
    TooDeep,

    /// A numeric evaluation met a symbol without a value.
    #[error("symbol `{0}` has no numeric value")]
    FreeSymbol(Identifier),

    #[error("division by zero")]
    DivisionByZero,

    /// The result is `nan` or otherwise not a number.
    #[error("the result is undefined")]
    Undefined,

    #[error("`{0}` cannot be differentiated")]
    NotDifferentiable(String),

    #[error("no elementary antiderivative found for `{0}`")]
    NoAntiderivative(String),

    #[error("cannot solve `{0}`")]
    Unsolvable(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("the limit does not exist")]
    LimitDoesNotExist,

    #[error("the limit could not be determined")]
    LimitUndetermined,

    /// A sum, product or factorial exceeds the configured bound.
    #[error("{0} is too large to compute")]
    RangeTooLarge(String),

    /// The computation was abandoned by its caller.
    #[error("the computation was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe(errors: &[parser::Error<Full>]) -> String {
    if errors.is_empty() {
        return String::from("unknown error");
    }
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parse, Syntax};

    #[test]
    fn display_messages() {
        assert_eq!(Error::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            Error::FreeSymbol(Identifier::from('y')).to_string(),
            "symbol `y` has no numeric value"
        );
        let parse = Error::Parse(vec![
            parser::Error::new(Full::Syntax(Syntax::UnexpectedChar('$')), 2..=2),
            parser::Error::new(Full::Parse(Parse::ExpectedValue), 4..=4),
        ]);
        assert_eq!(
            parse.to_string(),
            "invalid expression: unexpected character '$' at position 3; expected a value at position 5"
        );
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
