use std::{
    cmp::Reverse,
    collections::BTreeSet,
    fmt::{self, Display},
};

use itertools::Itertools;
use num::{complex::Complex64, One};

use crate::{make_power, Bindings, Constant, Expr, Expression, Factor, Fraction, Identifier, Result};

/// Largest number of terms produced when multiplying out sums.
const MAX_DISTRIBUTED: usize = 4096;
/// Rounds of power merging before a term is accepted as settled.
const MAX_ROUNDS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    pub coeff: Fraction,
    pub factors: Vec<Factor>,
}

impl Default for Term {
    fn default() -> Self {
        Term {
            coeff: Fraction::one(),
            factors: Vec::new(),
        }
    }
}

impl Expression for Term {
    fn evaluate(&self, bindings: &Bindings) -> Result<Complex64> {
        self.factors
            .iter()
            .try_fold(Complex64::new(self.coeff.to_f64(), 0.0), |acc, factor| {
                Ok(acc * factor.evaluate(bindings)?)
            })
    }

    fn derivative(&self, by: &Identifier) -> Result<Expr> {
        // Product rule, one summand per factor that depends on `by`.
        let mut result = Expr::zero();
        for (i, factor) in self.factors.iter().enumerate() {
            let d = factor.derivative(by)?;
            if d.is_zero() {
                continue;
            }
            let mut factors = self
                .factors
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, f)| f.clone())
                .collect::<Vec<_>>();
            factors.push(Factor::Group(d));
            result.terms.push(Term {
                coeff: self.coeff.clone(),
                factors,
            });
        }
        Ok(result)
    }

    fn substitute(&self, id: &Identifier, value: &Expr) -> Self {
        Term {
            coeff: self.coeff.clone(),
            factors: self
                .factors
                .iter()
                .map(|f| f.substitute(id, value))
                .collect(),
        }
    }

    fn as_num(&self) -> Option<Fraction> {
        if self.factors.is_empty() {
            Some(self.coeff.clone())
        } else {
            None
        }
    }

    fn collect_identifiers(&self, into: &mut BTreeSet<Identifier>) {
        self.factors
            .iter()
            .for_each(|f| f.collect_identifiers(into));
    }

    fn any<P: Fn(&Factor) -> bool>(&self, pred: &P) -> bool {
        self.factors.iter().any(|f| f.any(pred))
    }

    fn depth(&self) -> usize {
        self.factors.iter().map(|f| f.depth()).max().unwrap_or(0) + 1
    }
}

impl Term {
    pub fn mul(&mut self, other: Term) {
        self.coeff *= other.coeff;
        self.factors.extend(other.factors);
    }

    pub fn has_denominator(&self) -> bool {
        self.factors.iter().any(|f| f.is_denominator())
    }

    fn has_constant(&self, c: Constant) -> bool {
        self.factors.iter().any(|f| *f == Factor::Const(c))
    }

    fn exceptional(c: Constant) -> Term {
        Term {
            coeff: Fraction::one(),
            factors: vec![Factor::Const(c)],
        }
    }

    /// Exactly `oo` or `-oo`.
    pub(crate) fn is_infinity(&self) -> bool {
        matches!(self.factors.as_slice(), [Factor::Const(Constant::Infinity)])
    }

    /// Sum of the exponents of the factors that contain a symbol.
    pub fn degree(&self) -> Fraction {
        self.factors
            .iter()
            .fold(Fraction::zero(), |acc, f| acc + f.degree())
    }

    pub fn simplify(&self) -> Expr {
        #[cfg(feature = "tracy")]
        profiling::scope!("Term::simplify");
        let parts = self.factors.iter().map(|f| f.simplify()).collect();
        let terms = distribute(self.coeff.clone(), parts)
            .into_iter()
            .flat_map(|t| t.settle(MAX_ROUNDS))
            .collect::<Vec<_>>();
        Expr::from(terms)
    }

    fn settle(self, rounds: usize) -> Vec<Term> {
        let next = self.combine();
        if rounds == 0 || matches!(next.as_slice(), [single] if *single == self) {
            return next;
        }
        next.into_iter()
            .flat_map(|t| t.settle(rounds - 1))
            .collect()
    }

    /// Merges factors with equal bases and rebuilds every power.
    fn combine(&self) -> Vec<Term> {
        let mut powers: Vec<(Expr, Expr)> = Vec::with_capacity(self.factors.len());
        for factor in &self.factors {
            let (base, exp) = factor.as_power();
            match powers.iter_mut().find(|(b, _)| *b == base) {
                Some(entry) => entry.1 = (entry.1.clone() + exp).simplify(),
                None => powers.push((base, exp)),
            }
        }
        let parts = powers
            .iter()
            .map(|(base, exp)| make_power(base, exp))
            .collect();
        distribute(self.coeff.clone(), parts)
            .into_iter()
            .filter_map(Term::tidy)
            .collect()
    }

    fn tidy(mut self) -> Option<Term> {
        if self.has_constant(Constant::NaN) {
            return Some(Term::exceptional(Constant::NaN));
        }
        let zoo = self.has_constant(Constant::ComplexInfinity);
        let oo = self.has_constant(Constant::Infinity);
        if (zoo || oo) && self.coeff.is_zero() {
            return Some(Term::exceptional(Constant::NaN));
        }
        if zoo {
            return Some(Term::exceptional(Constant::ComplexInfinity));
        }
        if self.coeff.is_zero() {
            return None;
        }
        if oo {
            self.coeff = Fraction::one().mul_sign(self.coeff.sign());
        }
        self.factors.sort_by_cached_key(|f| f.sort_key());
        Some(self)
    }

    /// Multiplies out every sum, including small integer powers of sums.
    pub fn expand(&self) -> Vec<Term> {
        let mut result = vec![Term {
            coeff: self.coeff.clone(),
            factors: Vec::new(),
        }];
        for factor in &self.factors {
            let expanded = factor.expand();
            result = multiply_out(result, expanded, true);
        }
        result
    }

    /// Key ordering terms for display: symbolic terms by falling degree, then
    /// constant terms, then plain numbers.
    pub(crate) fn order_key(&self) -> (u8, Reverse<Fraction>, String) {
        let class = if !self.is_constant() {
            0
        } else if !self.factors.is_empty() {
            1
        } else {
            2
        };
        let unit = Term {
            coeff: Fraction::one(),
            factors: self.factors.clone(),
        };
        (class, Reverse(self.degree()), unit.to_string())
    }

    /// Writes the term without its sign.
    pub(crate) fn write_abs(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for factor in &self.factors {
            match factor.reciprocal() {
                Some(inverse) => denominator.push(inverse.to_string()),
                None => numerator.push(factor.to_string()),
            }
        }
        let coeff = self.coeff.abs();
        if !coeff.n().is_one() || numerator.is_empty() {
            numerator.insert(0, coeff.n().to_string());
        }
        if !coeff.d().is_one() {
            denominator.insert(0, coeff.d().to_string());
        }
        write!(f, "{}", numerator.join("*"))?;
        match denominator.len() {
            0 => Ok(()),
            1 => write!(f, "/{}", denominator[0]),
            _ => write!(f, "/({})", denominator.join("*")),
        }
    }
}

/// Multiplies `coeff` by every part, expanding sums into separate terms
/// unless one of the parts is a denominator, as in `(x + 1)/x`.
pub(crate) fn distribute(coeff: Fraction, parts: Vec<Expr>) -> Vec<Term> {
    let keep_sums = parts
        .iter()
        .any(|p| matches!(p.terms.as_slice(), [t] if t.has_denominator()));
    parts.into_iter().fold(
        vec![Term {
            coeff,
            factors: Vec::new(),
        }],
        |terms, part| multiply_out(terms, part, !keep_sums),
    )
}

fn multiply_out(mut terms: Vec<Term>, part: Expr, expand_sums: bool) -> Vec<Term> {
    match part.terms.len() {
        0 => {
            terms.iter_mut().for_each(|t| t.coeff = Fraction::zero());
            terms
        }
        1 => {
            let factor = part.terms.into_iter().next().unwrap_or_default();
            terms.iter_mut().for_each(|t| t.mul(factor.clone()));
            terms
        }
        n if !expand_sums || terms.len() * n > MAX_DISTRIBUTED => {
            terms
                .iter_mut()
                .for_each(|t| t.factors.push(Factor::Group(part.clone())));
            terms
        }
        _ => terms
            .into_iter()
            .cartesian_product(part.terms.iter())
            .map(|(mut t, p)| {
                t.mul(p.clone());
                t
            })
            .collect(),
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeff.is_neg() {
            write!(f, "-")?;
        }
        self.write_abs(f)
    }
}

pub trait ToTerm {
    fn term(self) -> Term;
}

impl ToTerm for Term {
    fn term(self) -> Term {
        self
    }
}

impl ToTerm for Fraction {
    fn term(self) -> Term {
        Term {
            coeff: self,
            factors: Vec::new(),
        }
    }
}

impl ToTerm for i64 {
    fn term(self) -> Term {
        Fraction::whole(self).term()
    }
}

impl ToTerm for Factor {
    fn term(self) -> Term {
        Term {
            coeff: Fraction::one(),
            factors: vec![self],
        }
    }
}

impl ToTerm for Identifier {
    fn term(self) -> Term {
        Factor::Identifier(self).term()
    }
}

impl ToTerm for Constant {
    fn term(self) -> Term {
        Factor::Const(self).term()
    }
}

impl ToTerm for Vec<Factor> {
    fn term(self) -> Term {
        Term {
            coeff: Fraction::one(),
            factors: self,
        }
    }
}

impl ToTerm for (Fraction, Factor) {
    fn term(self) -> Term {
        Term {
            coeff: self.0,
            factors: vec![self.1],
        }
    }
}

impl ToTerm for (Fraction, Vec<Factor>) {
    fn term(self) -> Term {
        Term {
            coeff: self.0,
            factors: self.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Factor {
        Factor::Identifier(Identifier::from('x'))
    }

    #[test]
    fn display_splits_denominators() {
        let term = (
            Fraction::new(-3, 2),
            vec![x(), Factor::Pow(Expr::from(Identifier::from('y')), Expr::number(-2))],
        )
            .term();
        assert_eq!(term.to_string(), "-3*x/(2*y**2)");
        assert_eq!(Fraction::new(1, 3).term().to_string(), "1/3");
        assert_eq!((Fraction::neg_one(), x()).term().to_string(), "-x");
    }

    #[test]
    fn product_rule() {
        let term = vec![x(), Factor::Func(crate::Func::Sin, Expr::from(x()))].term();
        let d = Expr::from(term).derivative(&Identifier::from('x')).unwrap();
        assert_eq!(d.to_string(), "x*cos(x) + sin(x)");
    }

    #[test]
    fn degree_counts_symbolic_exponents() {
        let term = vec![
            Factor::Pow(Expr::from(x()), Expr::number(3)),
            Factor::Const(Constant::Pi),
        ]
        .term();
        assert_eq!(term.degree(), Fraction::whole(3));
    }
}
