use std::collections::{BTreeSet, HashMap};

use num::complex::Complex64;

use crate::{identifier::Identifier, Result};

mod constant;
mod expr;
mod factor;
mod fraction;
mod func;
mod power;
mod term;

pub use constant::Constant;
pub use expr::Expr;
pub use factor::Factor;
pub use fraction::{Fraction, Sign, Signed};
pub use func::{Func, FACTORIAL_LIMIT};
pub use power::make_power;
pub use term::{Term, ToTerm};

/// Numeric values for free symbols.
pub type Bindings = HashMap<Identifier, Complex64>;

pub trait Expression: Sized + Clone {
    fn evaluate(&self, bindings: &Bindings) -> Result<Complex64>;
    fn derivative(&self, by: &Identifier) -> Result<Expr>;
    fn substitute(&self, id: &Identifier, value: &Expr) -> Self;
    fn as_num(&self) -> Option<Fraction>;
    fn collect_identifiers(&self, into: &mut BTreeSet<Identifier>);
    /// Whether any factor, at any nesting level, satisfies `pred`.
    fn any<P: Fn(&Factor) -> bool>(&self, pred: &P) -> bool;
    fn depth(&self) -> usize;

    fn identifiers(&self) -> BTreeSet<Identifier> {
        let mut ids = BTreeSet::new();
        self.collect_identifiers(&mut ids);
        ids
    }

    fn contains(&self, id: &Identifier) -> bool {
        self.any(&|f| matches!(f, Factor::Identifier(i) if i == id))
    }

    fn is_constant(&self) -> bool {
        !self.any(&|f| matches!(f, Factor::Identifier(_)))
    }

    /// Contains `zoo` or `nan`.
    fn is_poisoned(&self) -> bool {
        self.any(&|f| {
            matches!(
                f,
                Factor::Const(Constant::ComplexInfinity | Constant::NaN)
            )
        })
    }

    fn find_identifier(&self) -> Option<Identifier> {
        self.identifiers().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simplified(s: &str) -> String {
        s.parse::<Expr>().unwrap().simplify().to_string()
    }

    #[test]
    fn test_display() {
        let expr = Expr {
            terms: vec![
                Fraction::one().term(),
                (Fraction::whole(-2), Factor::Identifier(Identifier::from('e'))).term(),
            ],
        };

        assert_eq!(format!("{}", expr), "1 - 2*e");
    }

    #[test]
    fn simplify_collects_like_terms() {
        assert_eq!(simplified("2+2*2"), "6");
        assert_eq!(simplified("(15-3)/4"), "3");
        assert_eq!(simplified("x + x + 2*x"), "4*x");
        assert_eq!(simplified("x*x*x"), "x**3");
        assert_eq!(simplified("x - x"), "0");
        assert_eq!(simplified("(x+1)*(x-1)"), "x**2 - 1");
        assert_eq!(simplified("x**2 + 2*x + 1 + x**3"), "x**3 + x**2 + 2*x + 1");
        assert_eq!(simplified("1 - x"), "1 - x");
    }

    #[test]
    fn simplify_powers_and_roots() {
        assert_eq!(simplified("sqrt(16)"), "4");
        assert_eq!(simplified("sqrt(8)"), "2*sqrt(2)");
        assert_eq!(simplified("1/sqrt(2)"), "sqrt(2)/2");
        assert_eq!(simplified("sqrt(-4)"), "2*I");
        assert_eq!(simplified("I*I"), "-1");
        assert_eq!(simplified("8**(1/3)"), "2");
        assert_eq!(simplified("x**2*x**-2"), "1");
        assert_eq!(simplified("(2*x)**3"), "8*x**3");
        assert_eq!(simplified("exp(log(x))"), "x");
        assert_eq!(simplified("x/(2*y)"), "x/(2*y)");
        assert_eq!(simplified("(x+1)**2"), "(x + 1)**2");
    }

    #[test]
    fn simplify_constants() {
        assert_eq!(simplified("pi*2"), "2*pi");
        assert_eq!(simplified("sin(pi/6)"), "1/2");
        assert_eq!(simplified("cos(pi)"), "-1");
        assert_eq!(simplified("sin(-x)"), "-sin(x)");
        assert_eq!(simplified("log(E)"), "1");
        assert_eq!(simplified("5!"), "120");
        assert_eq!(simplified("1/0"), "zoo");
        assert_eq!(simplified("0/0"), "nan");
        assert_eq!(simplified("oo - oo"), "nan");
        assert_eq!(simplified("oo + 1"), "oo");
    }

    #[test]
    fn simplify_keeps_value() {
        let bindings = Bindings::from([(Identifier::from('x'), Complex64::new(2.0, 0.0))]);
        for s in ["x ^ (3x + x ^ 2)", "(x+1)**3/(x-3)", "sin(x)**2 + cos(x)**2", "x*(x+1)*(x+2)"] {
            let expr = s.parse::<Expr>().unwrap();
            let simplified = expr.simplify();
            let a = expr.evaluate(&bindings).unwrap();
            let b = simplified.evaluate(&bindings).unwrap();
            assert!((a - b).norm() < 1e-9 * a.norm().max(1.0), "{s}: {a} != {b}");
        }
    }
}
