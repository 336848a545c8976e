//! Solving `expr = 0` for one unknown.

use std::{
    cmp::Ordering,
    fmt::{self, Display},
};

use num::{complex::Complex64, Integer};

use crate::{
    cancel, format_complex, make_power,
    poly::{self, Poly},
    Bindings, Constant, Error, Expr, Expression, Factor, Fraction, Func, Identifier, Result, Term,
};

/// Nested inversions tried before giving up on `g(u) = c`.
const MAX_ISOLATION_DEPTH: usize = 4;
/// Rounds of denominator clearing.
const MAX_CLEARING_ROUNDS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub enum Solution {
    Exact(Expr),
    Approx(Complex64),
}

impl Solution {
    /// Numeric value, when the solution has no free symbols.
    pub fn value(&self) -> Option<Complex64> {
        match self {
            Solution::Exact(expr) => expr.evaluate(&Bindings::new()).ok(),
            Solution::Approx(z) => Some(*z),
        }
    }

    /// The value when it is real.
    pub fn real(&self) -> Option<f64> {
        self.value()
            .filter(|z| z.im.abs() <= 1e-12 * z.re.abs().max(1.0))
            .map(|z| z.re)
    }

    fn same(&self, other: &Solution) -> bool {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => (a - b).norm() <= 1e-9 * a.norm().max(1.0),
            _ => self == other,
        }
    }

    /// Real solutions first, then by real and imaginary part.
    fn order(&self, other: &Solution) -> Ordering {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => (self.real().is_none())
                .cmp(&other.real().is_none())
                .then(a.re.partial_cmp(&b.re).unwrap_or(Ordering::Equal))
                .then(a.im.partial_cmp(&b.im).unwrap_or(Ordering::Equal)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solution::Exact(expr) => write!(f, "{}", expr),
            Solution::Approx(z) => write!(f, "{}", format_complex(*z)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolutionSet {
    Finite(Vec<Solution>),
    /// The equation holds identically.
    All,
}

/// Solves `expr = 0` for `var`. Solutions are sorted by value and checked
/// against the original expression, so roots introduced by clearing
/// denominators or squaring are dropped.
pub fn solve(expr: &Expr, var: &Identifier) -> Result<SolutionSet> {
    #[cfg(feature = "tracy")]
    profiling::scope!("solve");
    let expr = expr.simplify();
    if expr.is_poisoned() {
        return Err(Error::Undefined);
    }
    let (numerator, denominators) = clear_denominators(&expr, var);
    if numerator.is_zero() {
        return Ok(SolutionSet::All);
    }
    if !numerator.contains(var) {
        return Ok(SolutionSet::Finite(Vec::new()));
    }
    log::debug!("solving {} = 0 for {}", numerator, var);

    let mut solutions: Vec<Solution> = Vec::new();
    for candidate in roots(&numerator, var, 0)? {
        cancel::check()?;
        let candidate = match candidate {
            Solution::Exact(e) => Solution::Exact(e.simplify()),
            approx => approx,
        };
        if !admissible(&expr, &denominators, var, &candidate) {
            log::debug!("dropping {} for {} = 0", candidate, expr);
            continue;
        }
        if solutions.iter().any(|s| s.same(&candidate)) {
            continue;
        }
        solutions.push(candidate);
    }
    solutions.sort_by(|a, b| a.order(b));
    Ok(SolutionSet::Finite(solutions))
}

/// Multiplies `expr` by every denominator containing `var`. Returns the
/// numerator and the cleared denominators as `(base, exponent)`.
pub(crate) fn clear_denominators(expr: &Expr, var: &Identifier) -> (Expr, Vec<(Expr, Fraction)>) {
    let mut numerator = expr.clone();
    let mut cleared = Vec::new();
    for _ in 0..MAX_CLEARING_ROUNDS {
        let mut denominators: Vec<(Expr, Fraction)> = Vec::new();
        for factor in numerator.terms.iter().flat_map(|t| t.factors.iter()) {
            let Factor::Pow(base, exp) = factor else {
                continue;
            };
            let Some(k) = exp.as_num().filter(|e| e.is_neg()).map(|e| -e) else {
                continue;
            };
            if !base.contains(var) {
                continue;
            }
            match denominators.iter_mut().find(|(b, _)| b == base) {
                Some(entry) if k > entry.1 => entry.1 = k,
                Some(_) => {}
                None => denominators.push((base.clone(), k)),
            }
        }
        if denominators.is_empty() {
            break;
        }
        let terms = numerator
            .terms
            .iter()
            .map(|t| {
                let mut t = t.clone();
                t.factors.extend(
                    denominators
                        .iter()
                        .map(|(b, k)| Factor::Pow(b.clone(), Expr::from(k.clone()))),
                );
                t
            })
            .collect::<Vec<Term>>();
        numerator = Expr::from(terms).simplify().expand();
        cleared.extend(denominators);
    }
    (numerator, cleared)
}

fn roots(expr: &Expr, var: &Identifier, depth: usize) -> Result<Vec<Solution>> {
    cancel::check()?;
    if let [term] = expr.terms.as_slice() {
        let dependent = term
            .factors
            .iter()
            .filter(|f| f.contains(var))
            .collect::<Vec<_>>();
        if dependent.len() > 1 || matches!(dependent.as_slice(), [Factor::Pow(..)]) {
            let mut all = Vec::new();
            for factor in dependent {
                all.extend(factor_roots(factor, var, depth)?);
            }
            return Ok(all);
        }
    }
    if let Some(poly) = Poly::from_expr(expr, var) {
        return poly_roots(&poly);
    }
    let solutions = isolate(&expr.expand(), &Expr::zero(), var, depth)?;
    Ok(solutions.into_iter().map(Solution::Exact).collect())
}

/// Zeros of one factor of a product.
fn factor_roots(factor: &Factor, var: &Identifier, depth: usize) -> Result<Vec<Solution>> {
    match factor {
        Factor::Pow(base, exp) => match exp.as_num() {
            Some(e) if e.is_pos() => roots(base, var, depth),
            Some(_) => Ok(Vec::new()),
            None if !base.contains(var) => Ok(Vec::new()),
            None => roots(base, var, depth),
        },
        Factor::Group(expr) => roots(expr, var, depth),
        factor => roots(&Expr::from(factor.clone()), var, depth),
    }
}

fn poly_roots(poly: &Poly) -> Result<Vec<Solution>> {
    let exact = |e: Expr| Solution::Exact(e.simplify());
    match poly.degree() {
        0 => Ok(Vec::new()),
        1 => Ok(vec![exact(-poly.coeff(0) * poly.coeff(1).recip())]),
        2 => Ok(quadratic(&poly.coeff(2), &poly.coeff(1), &poly.coeff(0))),
        _ => {
            if let Some(coeffs) = poly.rational() {
                let (found, rest) = poly::rational_roots(&coeffs);
                let mut solutions = found
                    .into_iter()
                    .map(|r| Solution::Exact(Expr::from(r)))
                    .collect::<Vec<_>>();
                solutions.extend(remainder_roots(&rest));
                return Ok(solutions);
            }
            let numeric = poly
                .coeffs
                .iter()
                .map(|c| c.evaluate(&Bindings::new()))
                .collect::<Result<Vec<_>>>()
                .map_err(|_| Error::Unsolvable(format!("{} = 0", poly.to_expr())))?;
            Ok(poly::durand_kerner(&numeric)
                .into_iter()
                .map(Solution::Approx)
                .collect())
        }
    }
}

/// Roots of a rational polynomial without rational roots of its own.
fn remainder_roots(coeffs: &[Fraction]) -> Vec<Solution> {
    let c = |i: usize| Expr::from(coeffs[i].clone());
    match coeffs.len() {
        0 | 1 => Vec::new(),
        2 => vec![Solution::Exact((-c(0) * c(1).recip()).simplify())],
        3 => quadratic(&c(2), &c(1), &c(0)),
        n => {
            let numeric = coeffs
                .iter()
                .map(|f| Complex64::new(f.to_f64(), 0.0))
                .collect::<Vec<_>>();
            let approx = poly::durand_kerner(&numeric);
            let degree = n - 1;
            let binomial = coeffs[1..degree].iter().all(|f| f.is_zero());
            if !binomial {
                return approx.into_iter().map(Solution::Approx).collect();
            }
            // a*x**n + b: real roots exactly, the rest numerically
            let value = -coeffs[0].clone() / coeffs[degree].clone();
            let root = make_power(
                &Expr::from(value.clone()),
                &Expr::from(Fraction::new(1, degree as i64)),
            );
            let mut solutions = Vec::new();
            if degree.is_odd() {
                solutions.push(Solution::Exact(root));
            } else if value.is_pos() {
                solutions.push(Solution::Exact(-root.clone()));
                solutions.push(Solution::Exact(root));
            }
            solutions.extend(
                approx
                    .into_iter()
                    .filter(|z| z.im != 0.0)
                    .map(Solution::Approx),
            );
            solutions
        }
    }
}

fn quadratic(a: &Expr, b: &Expr, c: &Expr) -> Vec<Solution> {
    let disc = (b.clone() * b.clone() - Expr::number(4) * a.clone() * c.clone()).simplify();
    let den = (Expr::number(2) * a.clone()).simplify().recip();
    if disc.is_zero() {
        return vec![Solution::Exact((-b.clone() * den).simplify())];
    }
    let root = make_power(&disc, &Expr::from(Fraction::new(1, 2)));
    vec![
        Solution::Exact(((-b.clone() - root.clone()) * den.clone()).simplify()),
        Solution::Exact(((-b.clone() + root) * den).simplify()),
    ]
}

fn unsolvable(lhs: &Expr, rhs: &Expr) -> Error {
    Error::Unsolvable(format!("{} = {}", lhs, rhs))
}

/// Solves `lhs = rhs` by undoing the outermost operation around `var`.
fn isolate(lhs: &Expr, rhs: &Expr, var: &Identifier, depth: usize) -> Result<Vec<Expr>> {
    if depth > MAX_ISOLATION_DEPTH {
        return Err(unsolvable(lhs, rhs));
    }
    cancel::check()?;
    let (dependent, free): (Vec<Term>, Vec<Term>) =
        lhs.terms.iter().cloned().partition(|t| t.contains(var));
    let [term] = dependent.as_slice() else {
        return Err(unsolvable(lhs, rhs));
    };
    let rhs = (rhs.clone() - Expr::from(free)).simplify();
    let (inner, outer): (Vec<Factor>, Vec<Factor>) =
        term.factors.iter().cloned().partition(|f| f.contains(var));
    let scale = Expr::from(Term {
        coeff: term.coeff.clone(),
        factors: outer,
    });
    let rhs = (rhs * scale.recip()).simplify();
    let [factor] = inner.as_slice() else {
        return Err(unsolvable(lhs, &rhs));
    };
    invert(factor, &rhs, var, depth)
}

fn invert(factor: &Factor, value: &Expr, var: &Identifier, depth: usize) -> Result<Vec<Expr>> {
    let again = |arg: &Expr, v: Expr| isolate(arg, &v.simplify(), var, depth + 1);
    let apply = |func: Func, v: &Expr| Expr::from(Factor::Func(func, v.clone()));
    let values = match factor {
        Factor::Identifier(_) => return Ok(vec![value.clone()]),
        Factor::Group(expr) => return again(expr, value.clone()),
        Factor::Pow(base, exp) if !exp.contains(var) => {
            // base**k = v  =>  base = v**(1/k), both signs for even k
            let root = make_power(value, &exp.clone().recip().simplify());
            let even = exp.as_num().map_or(false, |e| e.n().is_even());
            let values = if even {
                vec![root.clone(), -root]
            } else {
                vec![root]
            };
            return collect(values, |v| again(base, v));
        }
        Factor::Pow(base, exp) if !base.contains(var) => {
            // base**g = v  =>  g = log(v) / log(base)
            let log_value = apply(Func::Log, value);
            let g = if base.is_constant_e() {
                log_value
            } else {
                log_value * apply(Func::Log, base).recip()
            };
            return again(exp, g);
        }
        Factor::Func(func, arg) => {
            let values = match func {
                Func::Log => vec![Expr::constant(Constant::E).pow(value.clone())],
                Func::Sin => {
                    let a = apply(Func::Asin, value);
                    vec![a.clone(), Expr::constant(Constant::Pi) - a]
                }
                Func::Cos => {
                    let a = apply(Func::Acos, value);
                    vec![a.clone(), Expr::constant(Constant::Pi).scale(&Fraction::whole(2)) - a]
                }
                Func::Tan => vec![apply(Func::Atan, value)],
                Func::Cot => vec![apply(Func::Atan, &value.clone().recip())],
                Func::Asin => vec![apply(Func::Sin, value)],
                Func::Acos => vec![apply(Func::Cos, value)],
                Func::Atan => vec![apply(Func::Tan, value)],
                Func::Abs => vec![value.clone(), -value.clone()],
                Func::Sinh | Func::Cosh | Func::Tanh | Func::Factorial => {
                    return Err(unsolvable(&Expr::from(factor.clone()), value))
                }
            };
            (values, arg)
        }
        _ => return Err(unsolvable(&Expr::from(factor.clone()), value)),
    };
    let (values, arg) = values;
    collect(values, |v| again(arg, v))
}

fn collect(values: Vec<Expr>, mut f: impl FnMut(Expr) -> Result<Vec<Expr>>) -> Result<Vec<Expr>> {
    let mut all = Vec::new();
    for v in values {
        all.extend(f(v)?);
    }
    Ok(all)
}

/// Whether `candidate` zeroes `expr` numerically without zeroing a
/// denominator. Candidates with free symbols are accepted.
fn admissible(
    expr: &Expr,
    denominators: &[(Expr, Fraction)],
    var: &Identifier,
    candidate: &Solution,
) -> bool {
    let at = |e: &Expr| -> (Expr, Bindings) {
        match candidate {
            Solution::Exact(value) => (e.substitute(var, value), Bindings::new()),
            Solution::Approx(z) => (e.clone(), Bindings::from([(var.clone(), *z)])),
        }
    };
    for (den, _) in denominators {
        let (den, bindings) = at(den);
        if let Ok(v) = den.evaluate(&bindings) {
            if v.norm() < 1e-12 {
                return false;
            }
        }
    }
    let (check, bindings) = at(expr);
    let mut total = Complex64::new(0.0, 0.0);
    let mut scale = 0.0f64;
    for term in &check.terms {
        match term.evaluate(&bindings) {
            Ok(v) => {
                total += v;
                scale += v.norm();
            }
            Err(_) => return true,
        }
    }
    total.is_finite() && total.norm() <= 1e-8 * scale.max(1.0)
}
