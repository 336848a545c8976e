//! Predeclared symbols and the choice of the implicit free variable.

use std::collections::BTreeSet;

use algebra::{Constant, Expr, Expression, Identifier};
use once_cell::sync::Lazy;

pub struct ImplicitVariables {
    /// Symbols in order of preference.
    pub symbols: [Identifier; 3],
    pub constants: [Constant; 4],
}

pub static IMPLICIT: Lazy<ImplicitVariables> = Lazy::new(|| ImplicitVariables {
    symbols: [Identifier::from('x'), Identifier::from('y'), Identifier::from('z')],
    constants: [Constant::Pi, Constant::E, Constant::I, Constant::Infinity],
});

const SERIES_INDICES: [char; 4] = ['n', 'k', 'i', 'j'];

impl ImplicitVariables {
    pub fn primary(&self) -> &Identifier {
        &self.symbols[0]
    }

    /// Names of predeclared constants can never be variables.
    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.iter().any(|c| c.as_str() == name)
    }
}

/// The variable an operation on `expr` is taken with respect to: `x`, else
/// `y` or `z`, else the first free symbol alphabetically. Defaults to `x`.
pub fn free_variable(expr: &Expr) -> Identifier {
    pick(&expr.identifiers(), &IMPLICIT.symbols)
}

/// Summation index of `expr`, preferring `n`, `k`, `i` and `j`.
pub fn series_index(expr: &Expr) -> Identifier {
    let preferred = SERIES_INDICES.map(Identifier::from);
    pick(&expr.identifiers(), &preferred)
}

fn pick(ids: &BTreeSet<Identifier>, preferred: &[Identifier]) -> Identifier {
    preferred
        .iter()
        .find(|id| ids.contains(*id))
        .or_else(|| ids.iter().next())
        .cloned()
        .unwrap_or_else(|| IMPLICIT.primary().clone())
}

/// An explicit variable name, or the implicit one for `expr`.
pub fn variable_or(name: Option<&str>, expr: &Expr, default: fn(&Expr) -> Identifier) -> Identifier {
    match name {
        Some(name) => Identifier::new(name),
        None => default(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> String {
        free_variable(&s.parse().unwrap()).to_string()
    }

    #[test]
    fn preference() {
        assert_eq!(var("y + x"), "x");
        assert_eq!(var("z*y"), "y");
        assert_eq!(var("b + a"), "a");
        assert_eq!(var("t**2"), "t");
        assert_eq!(var("2*pi"), "x");
        assert_eq!(var("theta + alpha"), "alpha");
    }

    #[test]
    fn series_indices() {
        let index = |s: &str| series_index(&s.parse().unwrap()).to_string();
        assert_eq!(index("k**2 + x"), "k");
        assert_eq!(index("x**n"), "n");
        assert_eq!(index("1/m"), "m");
        assert_eq!(index("5"), "x");
    }

    #[test]
    fn constants_are_not_symbols() {
        assert_eq!(IMPLICIT.primary().as_str(), "x");
        let expr: Expr = "E + I + oo".parse().unwrap();
        assert!(expr.identifiers().is_empty());
        assert!(IMPLICIT.is_constant("pi"));
        assert!(IMPLICIT.is_constant("oo"));
        assert!(!IMPLICIT.is_constant("x"));
        assert!(!IMPLICIT.is_constant("e"));
    }
}
