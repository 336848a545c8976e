use std::fmt::Display;

/// Name of a free symbol, e.g. `x`, `alpha` or `x_1`.
#[derive(PartialEq, Eq, Hash, Clone, Debug, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Internal placeholder used for substitutions. It cannot be produced by
    /// the parser, so it never clashes with a user symbol.
    pub(crate) fn placeholder() -> Self {
        Identifier(String::from("_u"))
    }

    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        matches!(chars.next(), Some(c) if c.is_alphabetic())
            && chars.all(|c| c.is_alphanumeric() || c == '_')
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for Identifier {
    fn from(c: char) -> Self {
        Identifier(c.to_string())
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(name)
    }
}
