use std::{
    collections::BTreeSet,
    fmt::Display,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use itertools::Itertools;
use num::complex::Complex64;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    parser::{expr_from_str, Full, Parse},
    Bindings, Constant, Error, Expression, Factor, Fraction, Identifier, Result, Sign, Term,
};

use super::ToTerm;

/// A sum of terms. The empty sum is zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Expr {
    pub terms: Vec<Term>,
}

impl Expression for Expr {
    fn evaluate(&self, bindings: &Bindings) -> Result<Complex64> {
        self.terms
            .iter()
            .try_fold(Complex64::new(0.0, 0.0), |acc, term| {
                Ok(acc + term.evaluate(bindings)?)
            })
    }

    fn derivative(&self, by: &Identifier) -> Result<Expr> {
        #[cfg(feature = "tracy")]
        profiling::scope!("Expr::derivative");
        let parts = self
            .terms
            .par_iter()
            .map(|term| term.derivative(by))
            .collect::<Result<Vec<Expr>>>()?;
        let d = Expr::from(
            parts
                .into_iter()
                .flat_map(|e| e.terms)
                .collect::<Vec<_>>(),
        );
        Ok(d.simplify())
    }

    fn substitute(&self, id: &Identifier, value: &Expr) -> Self {
        Expr {
            terms: self
                .terms
                .iter()
                .map(|t| t.substitute(id, value))
                .collect(),
        }
    }

    fn as_num(&self) -> Option<Fraction> {
        match self.terms.as_slice() {
            [] => Some(Fraction::zero()),
            [term] => term.as_num(),
            _ => None,
        }
    }

    fn collect_identifiers(&self, into: &mut BTreeSet<Identifier>) {
        self.terms
            .iter()
            .for_each(|t| t.collect_identifiers(into));
    }

    fn any<P: Fn(&Factor) -> bool>(&self, pred: &P) -> bool {
        self.terms.iter().any(|t| t.any(pred))
    }

    fn depth(&self) -> usize {
        self.terms.iter().map(|t| t.depth()).max().unwrap_or(0)
    }
}

impl Expr {
    pub fn zero() -> Expr {
        Expr { terms: Vec::new() }
    }

    pub fn one() -> Expr {
        Expr::from(Fraction::one())
    }

    pub fn number(n: i64) -> Expr {
        Expr::from(Fraction::whole(n))
    }

    pub fn constant(c: Constant) -> Expr {
        Expr::from(Factor::Const(c))
    }

    pub fn symbol(id: &Identifier) -> Expr {
        Expr::from(Factor::Identifier(id.clone()))
    }

    pub fn is_zero(&self) -> bool {
        self.terms
            .iter()
            .all(|t| t.coeff.is_zero() && t.factors.is_empty())
    }

    pub fn is_one(&self) -> bool {
        matches!(self.terms.as_slice(), [t] if t.coeff.is_one() && t.factors.is_empty())
    }

    /// A single term with a negative coefficient.
    pub fn is_negative(&self) -> bool {
        matches!(self.terms.as_slice(), [t] if t.coeff.is_neg())
    }

    pub fn is_constant_of(&self, c: Constant) -> bool {
        matches!(self.as_factor(), Some(Factor::Const(k)) if *k == c)
    }

    pub fn is_constant_e(&self) -> bool {
        self.is_constant_of(Constant::E)
    }

    pub fn is_nan(&self) -> bool {
        self.is_constant_of(Constant::NaN)
    }

    /// Prints without parentheses as the base of a power.
    pub fn is_atomic(&self) -> bool {
        match self.terms.as_slice() {
            [] => true,
            [term] if term.factors.is_empty() => term.coeff.is_integer() && !term.coeff.is_neg(),
            [term] => {
                term.coeff.is_one()
                    && matches!(
                        term.factors.as_slice(),
                        [Factor::Identifier(_) | Factor::Const(_) | Factor::Func(..) | Factor::Group(_)]
                    )
            }
            _ => false,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self.terms.as_slice() {
            [term] => Some(term),
            _ => None,
        }
    }

    /// The only factor of a unit term.
    pub fn as_factor(&self) -> Option<&Factor> {
        match self.terms.as_slice() {
            [term] if term.coeff.is_one() => match term.factors.as_slice() {
                [factor] => Some(factor),
                _ => None,
            },
            _ => None,
        }
    }

    /// `Some(sign)` for `oo` and `-oo`.
    pub fn as_infinity(&self) -> Option<Sign> {
        match self.terms.as_slice() {
            [term] if term.is_infinity() => Some(term.coeff.sign()),
            _ => None,
        }
    }

    pub fn scale(&self, by: &Fraction) -> Expr {
        Expr {
            terms: self
                .terms
                .iter()
                .map(|t| Term {
                    coeff: t.coeff.clone() * by.clone(),
                    factors: t.factors.clone(),
                })
                .collect(),
        }
    }

    pub fn recip(self) -> Expr {
        if let Some(inverse) = self.as_num().and_then(|n| n.inverse()) {
            return Expr::from(inverse);
        }
        Expr::from(Factor::Pow(self, Expr::number(-1)))
    }

    pub fn pow(self, exp: Expr) -> Expr {
        Expr::from(Factor::Pow(self, exp))
    }

    /// Multiplies out every product of sums and simplifies the result.
    pub fn expand(&self) -> Expr {
        #[cfg(feature = "tracy")]
        profiling::scope!("Expr::expand");
        Expr::from(
            self.terms
                .iter()
                .flat_map(Term::expand)
                .collect::<Vec<_>>(),
        )
        .simplify()
    }

    pub fn simplify(&self) -> Expr {
        #[cfg(feature = "tracy")]
        profiling::scope!("Expr::simplify");
        let terms = self
            .terms
            .par_iter()
            .map(Term::simplify)
            .collect::<Vec<Expr>>()
            .into_iter()
            .flat_map(|e| e.terms)
            .collect::<Vec<_>>();
        Expr::gather(terms)
    }

    /// Collects like terms of already simplified terms into canonical order.
    fn gather(terms: Vec<Term>) -> Expr {
        let holds = |t: &Term, c: Constant| t.factors.contains(&Factor::Const(c));
        if terms.iter().any(|t| holds(t, Constant::NaN)) {
            return Expr::constant(Constant::NaN);
        }
        let zoo = terms
            .iter()
            .filter(|t| holds(t, Constant::ComplexInfinity))
            .count();
        let (pos, neg) = terms
            .iter()
            .filter(|t| holds(t, Constant::Infinity))
            .fold((false, false), |(pos, neg), t| {
                (pos || t.coeff.is_pos(), neg || t.coeff.is_neg())
            });
        if zoo > 1 || (zoo == 1 && (pos || neg)) || (pos && neg) {
            return Expr::constant(Constant::NaN);
        }
        if zoo == 1 {
            return Expr::constant(Constant::ComplexInfinity);
        }
        let infinite = pos || neg;

        let mut terms = terms
            .into_iter()
            .filter(|t| !infinite || holds(t, Constant::Infinity) || !t.is_constant())
            .collect::<Vec<_>>();
        terms.sort_by(|a, b| a.factors.cmp(&b.factors));
        let mut terms = terms
            .into_iter()
            .coalesce(|mut a, b| {
                if a.factors == b.factors {
                    a.coeff += b.coeff;
                    Ok(a)
                } else {
                    Err((a, b))
                }
            })
            .filter(|t| !t.coeff.is_zero())
            .map(|mut t| {
                if holds(&t, Constant::Infinity) {
                    t.coeff = Fraction::one().mul_sign(t.coeff.sign());
                }
                t
            })
            .collect::<Vec<_>>();
        terms.sort_by_cached_key(Term::order_key);

        // Prefer `1 - x` over `-x + 1`.
        if terms.first().map_or(false, |t| t.coeff.is_neg()) {
            if let Some(i) = terms.iter().position(|t| t.coeff.is_pos()) {
                let term = terms.remove(i);
                terms.insert(0, term);
            }
        }
        Expr::from(terms)
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(mut self, rhs: Expr) -> Expr {
        self.terms.extend(rhs.terms);
        self
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self + -rhs
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(mut self) -> Expr {
        self.terms
            .iter_mut()
            .for_each(|t| t.coeff = -std::mem::take(&mut t.coeff));
        self
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        if let ([a], [b]) = (self.terms.as_slice(), rhs.terms.as_slice()) {
            let mut term = a.clone();
            term.mul(b.clone());
            return Expr::from(term);
        }
        Expr::from(vec![Factor::Group(self), Factor::Group(rhs)])
    }
}

impl FromStr for Expr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        expr_from_str(s).map_err(|errors| {
            if errors.iter().any(|e| e.err == Full::Parse(Parse::TooDeep)) {
                Error::TooDeep
            } else {
                Error::Parse(errors)
            }
        })
    }
}

impl TryFrom<&str> for Expr {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, term) in self.terms.iter().enumerate() {
            match (i, term.coeff.is_neg()) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            term.write_abs(f)?;
        }
        Ok(())
    }
}

impl From<Vec<Term>> for Expr {
    fn from(terms: Vec<Term>) -> Self {
        Expr { terms }
    }
}

impl<T: ToTerm> From<T> for Expr {
    fn from(term: T) -> Self {
        Expr {
            terms: vec![term.term()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_reported() {
        assert!(matches!("2 +".parse::<Expr>(), Err(Error::Parse(_))));
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(deep.parse::<Expr>(), Err(Error::TooDeep)));
    }

    #[test]
    fn products_of_sums_are_grouped() {
        let a = Expr::try_from("x + 1").unwrap();
        let b = Expr::try_from("x - 1").unwrap();
        let product = a * b;
        assert_eq!(product.terms.len(), 1);
        assert_eq!(product.to_string(), "(x + 1)*(x - 1)");
        assert_eq!(product.expand().to_string(), "x**2 - 1");
    }

    #[test]
    fn expand_powers_of_sums() {
        let expr = Expr::try_from("(x + 1)**3").unwrap().simplify();
        assert_eq!(expr.to_string(), "(x + 1)**3");
        assert_eq!(expr.expand().to_string(), "x**3 + 3*x**2 + 3*x + 1");
    }

    #[test]
    fn infinities() {
        let oo = Expr::constant(Constant::Infinity);
        assert_eq!(oo.as_infinity(), Some(Sign::Pos));
        assert_eq!((-oo.clone()).as_infinity(), Some(Sign::Neg));
        assert_eq!((oo.clone() + oo).simplify().to_string(), "oo");
    }
}
