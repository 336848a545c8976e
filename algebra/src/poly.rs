//! Univariate polynomials over expressions, and exact and numeric root finding
//! for rational coefficients.

use num::{complex::Complex64, BigInt, Integer, One, Signed as _, ToPrimitive, Zero};

use crate::{Expr, Expression, Factor, Fraction, Identifier, Term};

/// Polynomials above this degree are not treated as polynomials.
pub const MAX_DEGREE: usize = 64;
/// Candidate pairs tried by the rational root search.
const MAX_CANDIDATES: usize = 20_000;
const MAX_ITERATIONS: usize = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    pub var: Identifier,
    /// `coeffs[i]` multiplies `var**i`. The last coefficient is never zero.
    pub coeffs: Vec<Expr>,
}

impl Poly {
    /// Reads `expr` as a polynomial in `var` after expanding it. `None` when
    /// `var` occurs anywhere but in non-negative integer powers.
    pub fn from_expr(expr: &Expr, var: &Identifier) -> Option<Poly> {
        #[cfg(feature = "tracy")]
        profiling::scope!("Poly::from_expr");
        let expanded = expr.expand();
        let mut coeffs: Vec<Vec<Term>> = Vec::new();
        for term in expanded.terms {
            let mut degree = 0usize;
            let mut rest = Vec::with_capacity(term.factors.len());
            for factor in term.factors {
                match power_of(&factor, var) {
                    Some(n) => degree += n,
                    None if factor.contains(var) => return None,
                    None => rest.push(factor),
                }
            }
            if degree > MAX_DEGREE {
                return None;
            }
            if coeffs.len() <= degree {
                coeffs.resize_with(degree + 1, Vec::new);
            }
            coeffs[degree].push(Term {
                coeff: term.coeff,
                factors: rest,
            });
        }
        let mut coeffs = coeffs
            .into_iter()
            .map(|terms| Expr::from(terms).simplify())
            .collect::<Vec<_>>();
        while coeffs.last().map_or(false, |c| c.is_zero()) {
            coeffs.pop();
        }
        Some(Poly {
            var: var.clone(),
            coeffs,
        })
    }

    /// Degree, with the zero polynomial at degree 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn coeff(&self, i: usize) -> Expr {
        self.coeffs.get(i).cloned().unwrap_or_default()
    }

    pub fn leading(&self) -> Expr {
        self.coeffs.last().cloned().unwrap_or_default()
    }

    /// All coefficients as exact rationals.
    pub fn rational(&self) -> Option<Vec<Fraction>> {
        self.coeffs.iter().map(|c| c.as_num()).collect()
    }

    pub fn to_expr(&self) -> Expr {
        let x = Expr::symbol(&self.var);
        let terms = self
            .coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| c.clone() * x.clone().pow(Expr::number(i as i64)))
            .fold(Expr::zero(), |acc, t| acc + t);
        terms.simplify()
    }
}

fn power_of(factor: &Factor, var: &Identifier) -> Option<usize> {
    match factor {
        Factor::Identifier(id) if id == var => Some(1),
        Factor::Pow(base, exp) if matches!(base.as_factor(), Some(Factor::Identifier(id)) if id == var) => {
            exp.as_num()?
                .to_i64()
                .and_then(|n| usize::try_from(n).ok())
        }
        _ => None,
    }
}

/// Value of the polynomial with ascending `coeffs` at `x`.
pub fn horner(coeffs: &[Fraction], x: &Fraction) -> Fraction {
    coeffs
        .iter()
        .rev()
        .fold(Fraction::zero(), |acc, c| acc * x.clone() + c.clone())
}

/// Quotient of the division by `var - root`, assuming `root` is a root.
pub fn deflate(coeffs: &[Fraction], root: &Fraction) -> Vec<Fraction> {
    let n = coeffs.len();
    if n < 2 {
        return Vec::new();
    }
    let mut quotient = vec![Fraction::zero(); n - 1];
    let mut carry = Fraction::zero();
    for i in (1..n).rev() {
        carry = carry * root.clone() + coeffs[i].clone();
        quotient[i - 1] = carry.clone();
    }
    quotient
}

fn divisors(n: &BigInt) -> Option<Vec<u64>> {
    let n = n.abs().to_u64()?;
    if n == 0 || n > 1_000_000_000_000 {
        return None;
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1u64;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d * d != n {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    Some(small)
}

/// Splits off every rational root of the polynomial, leaving a remainder of
/// degree at most two or without rational roots. Roots are returned with
/// multiplicity.
pub fn rational_roots(coeffs: &[Fraction]) -> (Vec<Fraction>, Vec<Fraction>) {
    #[cfg(feature = "tracy")]
    profiling::scope!("rational_roots");
    let mut coeffs = coeffs.to_vec();
    let mut roots = Vec::new();
    while coeffs.len() > 1 && coeffs[0].is_zero() {
        coeffs.remove(0);
        roots.push(Fraction::zero());
    }
    if coeffs.len() <= 3 {
        return (roots, coeffs);
    }

    let lcm = coeffs
        .iter()
        .fold(BigInt::one(), |acc, c| acc.lcm(c.d()));
    let scaled = coeffs
        .iter()
        .map(|c| c.n() * (&lcm / c.d()))
        .collect::<Vec<_>>();
    let (Some(first), Some(last)) = (scaled.first(), scaled.last()) else {
        return (roots, coeffs);
    };
    let (Some(ps), Some(qs)) = (divisors(first), divisors(last)) else {
        return (roots, coeffs);
    };
    if ps.len() * qs.len() > MAX_CANDIDATES {
        return (roots, coeffs);
    }

    let mut candidates = ps
        .iter()
        .flat_map(|p| qs.iter().map(move |q| (*p, *q)))
        .filter(|(p, q)| p.gcd(q) == 1)
        .flat_map(|(p, q)| {
            let f = Fraction::from_ratio(BigInt::from(p), BigInt::from(q));
            [f.clone(), f.map(|f| -f)]
        })
        .flatten()
        .collect::<Vec<_>>();
    candidates.sort();
    for candidate in candidates {
        while coeffs.len() > 3 && horner(&coeffs, &candidate).is_zero() {
            coeffs = deflate(&coeffs, &candidate);
            roots.push(candidate.clone());
        }
        if coeffs.len() <= 3 {
            break;
        }
    }
    (roots, coeffs)
}

/// All complex roots of the polynomial with ascending `coeffs` by
/// simultaneous Durand–Kerner iteration.
pub fn durand_kerner(coeffs: &[Complex64]) -> Vec<Complex64> {
    #[cfg(feature = "tracy")]
    profiling::scope!("durand_kerner");
    let Some(lead) = coeffs.last().copied().filter(|c| !c.is_zero()) else {
        return Vec::new();
    };
    let n = coeffs.len() - 1;
    let monic = coeffs.iter().map(|c| c / lead).collect::<Vec<_>>();
    let eval = |x: Complex64| monic.iter().rev().fold(Complex64::zero(), |acc, c| acc * x + c);

    let seed = Complex64::new(0.4, 0.9);
    let mut roots = (0..n).map(|k| seed.powu(k as u32)).collect::<Vec<_>>();
    for _ in 0..MAX_ITERATIONS {
        let mut change = 0.0f64;
        for i in 0..n {
            let x = roots[i];
            let den = roots
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .fold(Complex64::one(), |acc, (_, r)| acc * (x - r));
            if den.is_zero() {
                continue;
            }
            let step = eval(x) / den;
            roots[i] = x - step;
            change = change.max(step.norm());
        }
        if change < 1e-14 {
            break;
        }
    }
    roots
        .into_iter()
        .map(|r| {
            if r.im.abs() < 1e-10 * r.re.abs().max(1.0) {
                Complex64::new(r.re, 0.0)
            } else {
                r
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractions(values: &[i64]) -> Vec<Fraction> {
        values.iter().map(|v| Fraction::whole(*v)).collect()
    }

    #[test]
    fn reads_coefficients() {
        let x = Identifier::from('x');
        let poly = Poly::from_expr(&"(x + 1)**2 - 1 + a*x**3".parse().unwrap(), &x).unwrap();
        assert_eq!(poly.degree(), 3);
        assert_eq!(poly.coeff(0).to_string(), "0");
        assert_eq!(poly.coeff(1).to_string(), "2");
        assert_eq!(poly.coeff(3).to_string(), "a");
        assert!(poly.rational().is_none());

        assert!(Poly::from_expr(&"sin(x) + x".parse().unwrap(), &x).is_none());
        assert!(Poly::from_expr(&"1/x".parse().unwrap(), &x).is_none());
    }

    #[test]
    fn rational_root_search() {
        // (x - 1)(x - 2)(x - 3)(x + 1/2)
        let coeffs = vec![
            Fraction::whole(-3),
            Fraction::new(-1, 2),
            Fraction::whole(8),
            Fraction::new(-11, 2),
            Fraction::one(),
        ];
        let (roots, rest) = rational_roots(&coeffs);
        assert_eq!(roots.len(), 2);
        assert_eq!(rest.len(), 3);
        let (roots, rest) = rational_roots(&fractions(&[0, 0, 2, 0, 1]));
        assert_eq!(roots, vec![Fraction::zero(), Fraction::zero()]);
        assert_eq!(rest, fractions(&[2, 0, 1]));
    }

    #[test]
    fn deflation_divides_exactly() {
        let coeffs = fractions(&[-6, 11, -6, 1]);
        assert!(horner(&coeffs, &Fraction::whole(2)).is_zero());
        assert_eq!(deflate(&coeffs, &Fraction::whole(2)), fractions(&[3, -4, 1]));
    }

    #[test]
    fn numeric_roots() {
        let coeffs = [-2.0, 0.0, 0.0, 1.0].map(|c| Complex64::new(c, 0.0));
        let roots = durand_kerner(&coeffs);
        assert_eq!(roots.len(), 3);
        let real = roots.iter().filter(|r| r.im == 0.0).collect::<Vec<_>>();
        assert_eq!(real.len(), 1);
        assert!((real[0].re - 2f64.cbrt()).abs() < 1e-10);
    }
}
