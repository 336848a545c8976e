//! Antiderivatives by table lookup, linear substitution, `f'(x)*g(f(x))`
//! substitution and integration by parts, and definite integrals through
//! their antiderivative.

use rayon::prelude::*;

use crate::{
    cancel,
    limit::{limit, Direction, LimitPoint, LimitValue},
    poly::Poly,
    solve::{clear_denominators, solve, SolutionSet},
    Bindings, Error, Expr, Expression, Factor, Fraction, Func, Identifier, Result, Sign, Term,
};

/// Nesting of substitutions and integrations by parts.
const MAX_DEPTH: usize = 6;

/// Indefinite integral of `expr` with respect to `var`, without the constant
/// of integration.
pub fn integrate(expr: &Expr, var: &Identifier) -> Result<Expr> {
    #[cfg(feature = "tracy")]
    profiling::scope!("integrate");
    let f = expr.simplify();
    if f.is_poisoned() {
        return Err(Error::Undefined);
    }
    let result = antiderivative(&f, var, 0)?;
    log::debug!("integral of {} d{} = {}", f, var, result);
    Ok(result)
}

/// `F(upper) - F(lower)` where `F` is an antiderivative of `expr`. Infinite
/// bounds and bounds at singularities of `F` are taken as one-sided limits.
pub fn integrate_definite(
    expr: &Expr,
    var: &Identifier,
    lower: &Expr,
    upper: &Expr,
) -> Result<Expr> {
    #[cfg(feature = "tracy")]
    profiling::scope!("integrate_definite");
    let f = expr.simplify();
    if pole_between(&f, var, lower, upper)? {
        return Err(Error::Undefined);
    }
    let antiderivative = integrate(&f, var)?;
    let upper = value_at(&antiderivative, var, upper, Direction::Minus)?;
    let lower = value_at(&antiderivative, var, lower, Direction::Plus)?;
    let result = (upper - lower).simplify();
    if result.is_poisoned() {
        return Err(Error::Undefined);
    }
    Ok(result)
}

fn value_at(f: &Expr, var: &Identifier, at: &Expr, direction: Direction) -> Result<Expr> {
    let point = LimitPoint::from_expr(at);
    if let LimitPoint::Finite(p) = &point {
        let value = f.substitute(var, p).simplify();
        if !value.is_poisoned() {
            return Ok(value);
        }
    }
    match limit(f, var, &point, direction)? {
        LimitValue::Approx(_) => Err(Error::LimitUndetermined),
        value => value.to_expr().ok_or(Error::Undefined),
    }
}

/// Whether a real pole of `f` lies strictly between numeric bounds.
fn pole_between(f: &Expr, var: &Identifier, lower: &Expr, upper: &Expr) -> Result<bool> {
    let real = |e: &Expr| -> Option<f64> {
        match LimitPoint::from_expr(e) {
            LimitPoint::Infinity(Sign::Pos) => Some(f64::INFINITY),
            LimitPoint::Infinity(Sign::Neg) => Some(f64::NEG_INFINITY),
            LimitPoint::Finite(p) => p
                .evaluate(&Bindings::new())
                .ok()
                .filter(|z| z.im == 0.0)
                .map(|z| z.re),
        }
    };
    let (Some(a), Some(b)) = (real(lower), real(upper)) else {
        return Ok(false);
    };
    let (a, b) = (a.min(b), a.max(b));
    let (_, denominators) = clear_denominators(f, var);
    for (den, _) in &denominators {
        if let SolutionSet::Finite(poles) = solve(den, var)? {
            if poles
                .iter()
                .filter_map(|p| p.real())
                .any(|p| a < p && p < b)
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn antiderivative(f: &Expr, var: &Identifier, depth: usize) -> Result<Expr> {
    if depth > MAX_DEPTH {
        return Err(Error::NoAntiderivative(f.to_string()));
    }
    cancel::check()?;
    let by_terms = |f: &Expr| -> Option<Expr> {
        let parts: Option<Vec<Expr>> = f
            .terms
            .par_iter()
            .map(|t| integrate_term(t, var, depth))
            .collect();
        parts.map(|parts| parts.into_iter().fold(Expr::zero(), |acc, p| acc + p).simplify())
    };
    if let Some(result) = by_terms(f) {
        return Ok(result);
    }
    let expanded = f.expand();
    if expanded != *f {
        if let Some(result) = by_terms(&expanded) {
            return Ok(result);
        }
    }
    Err(Error::NoAntiderivative(f.to_string()))
}

fn integrate_term(term: &Term, var: &Identifier, depth: usize) -> Option<Expr> {
    let (dependent, free): (Vec<Factor>, Vec<Factor>) =
        term.factors.iter().cloned().partition(|f| f.contains(var));
    let constant = Expr::from(Term {
        coeff: term.coeff.clone(),
        factors: free,
    });
    let inner = match dependent.as_slice() {
        [] => Expr::symbol(var),
        [factor] => integrate_factor(factor, var, depth)
            .or_else(|| substitution(&dependent, var, depth))
            .or_else(|| by_parts(&dependent, var, depth))?,
        _ => substitution(&dependent, var, depth).or_else(|| by_parts(&dependent, var, depth))?,
    };
    Some(constant * inner)
}

fn integrate_factor(factor: &Factor, var: &Identifier, depth: usize) -> Option<Expr> {
    match factor {
        // ∫x = x^2/2
        Factor::Identifier(id) if id == var => {
            Some(Expr::from(Fraction::new(1, 2)) * Expr::symbol(var).pow(Expr::number(2)))
        }
        Factor::Group(inner) => antiderivative(inner, var, depth + 1).ok(),
        // ∫g(ax + b) = G(ax + b)/a
        Factor::Func(func, arg) => {
            let (a, _) = linear(arg, var)?;
            Some(func_antiderivative(*func, arg)? * a.recip())
        }
        Factor::Pow(base, exp) if !exp.contains(var) => power_rule(base, exp, var),
        // ∫c^(ax + b) = c^(ax + b)/(a*log(c))
        Factor::Pow(base, exp) if !base.contains(var) => {
            let (a, _) = linear(exp, var)?;
            let power = Expr::from(factor.clone());
            if base.is_constant_e() {
                Some(power * a.recip())
            } else {
                Some(power * (a * Expr::from(Factor::Func(Func::Log, base.clone()))).recip())
            }
        }
        _ => None,
    }
}

fn power_rule(base: &Expr, exp: &Expr, var: &Identifier) -> Option<Expr> {
    if let Some((a, _)) = linear(base, var) {
        // ∫(ax + b)^-1 = log(ax + b)/a
        if exp.as_num().map_or(false, |k| k == Fraction::neg_one()) {
            return Some(Expr::from(Factor::Func(Func::Log, base.clone())) * a.recip());
        }
        // ∫(ax + b)^k = (ax + b)^(k + 1)/((k + 1)*a)
        let k = (exp.clone() + Expr::one()).simplify();
        return Some(base.clone().pow(k.clone()) * (k * a).recip());
    }

    let k = exp.as_num()?;
    if k == Fraction::whole(2) {
        if let Some(Factor::Func(func @ (Func::Sin | Func::Cos), u)) = base.as_factor() {
            // ∫sin(u)^2 = u/2 - sin(2u)/4, ∫cos(u)^2 = u/2 + sin(2u)/4
            let (a, _) = linear(u, var)?;
            let half = Expr::from(Fraction::new(1, 2)) * u.clone();
            let quarter = Expr::from(Fraction::new(1, 4))
                * Expr::from(Factor::Func(Func::Sin, (Expr::number(2) * u.clone()).simplify()));
            let result = match func {
                Func::Sin => half - quarter,
                _ => half + quarter,
            };
            return Some(result * a.recip());
        }
    }
    if k == Fraction::neg_one() {
        return reciprocal_quadratic(base, var);
    }
    None
}

/// ∫1/(ax^2 + bx + c) for rational coefficients.
fn reciprocal_quadratic(base: &Expr, var: &Identifier) -> Option<Expr> {
    let poly = Poly::from_expr(base, var).filter(|p| p.degree() == 2)?;
    let coeffs = poly.rational()?;
    let [b, a] = [&coeffs[1], &coeffs[2]].map(|c| Expr::from(c.clone()));
    let disc = coeffs[1].clone() * coeffs[1].clone()
        - Fraction::whole(4) * coeffs[2].clone() * coeffs[0].clone();
    let x = Expr::symbol(var);
    let two_a = Expr::number(2) * a.clone();
    let sqrt = |d: Fraction| Expr::from(d).pow(Expr::from(Fraction::new(1, 2))).simplify();

    if disc.is_neg() {
        // 2/s * atan((2ax + b)/s) with s = sqrt(4ac - b^2)
        let s = sqrt(-disc);
        let arg = ((two_a * x + b) * s.clone().recip()).simplify();
        return Some(Expr::number(2) * s.recip() * Expr::from(Factor::Func(Func::Atan, arg)));
    }
    if disc.is_zero() {
        // -1/(a(x - r)) with the double root r
        let r = (-b * two_a.recip()).simplify();
        return Some(-(a * (x - r)).recip());
    }
    // (log(x - r1) - log(x - r2))/(a(r1 - r2))
    let s = sqrt(disc);
    let r1 = ((-b.clone() + s.clone()) * two_a.clone().recip()).simplify();
    let r2 = ((-b - s) * two_a.recip()).simplify();
    let log = |r: &Expr| Expr::from(Factor::Func(Func::Log, (x.clone() - r.clone()).simplify()));
    Some((log(&r1) - log(&r2)) * (a * (r1 - r2)).recip())
}

fn func_antiderivative(func: Func, u: &Expr) -> Option<Expr> {
    let f = |func: Func| Expr::from(Factor::Func(func, u.clone()));
    let log_of = |e: Expr| Expr::from(Factor::Func(Func::Log, e));
    let sqrt_one_minus_square = || {
        Expr::from(Factor::Pow(
            Expr::one() - u.clone().pow(Expr::number(2)),
            Expr::from(Fraction::new(1, 2)),
        ))
    };
    Some(match func {
        Func::Sin => -f(Func::Cos),
        Func::Cos => f(Func::Sin),
        Func::Tan => -log_of(f(Func::Cos)),
        Func::Cot => log_of(f(Func::Sin)),
        Func::Sinh => f(Func::Cosh),
        Func::Cosh => f(Func::Sinh),
        Func::Tanh => log_of(f(Func::Cosh)),
        Func::Log => u.clone() * f(Func::Log) - u.clone(),
        Func::Asin => u.clone() * f(Func::Asin) + sqrt_one_minus_square(),
        Func::Acos => u.clone() * f(Func::Acos) - sqrt_one_minus_square(),
        Func::Atan => {
            u.clone() * f(Func::Atan)
                - Expr::from(Fraction::new(1, 2))
                    * log_of(u.clone().pow(Expr::number(2)) + Expr::one())
        }
        Func::Abs => Expr::from(Fraction::new(1, 2)) * u.clone() * f(Func::Abs),
        Func::Factorial => return None,
    })
}

/// `(a, b)` when `expr = a*var + b`.
fn linear(expr: &Expr, var: &Identifier) -> Option<(Expr, Expr)> {
    let poly = Poly::from_expr(expr, var).filter(|p| p.degree() == 1)?;
    Some((poly.coeff(1), poly.coeff(0)))
}

/// Ways to read `factor` as `outer(u)` for an inner expression `u`.
fn candidates(factor: &Factor, u: &Expr) -> Vec<(Expr, Expr)> {
    let mut found = Vec::new();
    match factor {
        Factor::Func(func, arg) => found.push((arg.clone(), Expr::from(Factor::Func(*func, u.clone())))),
        Factor::Pow(base, exp) if exp.is_constant() => {
            found.push((base.clone(), Expr::from(Factor::Pow(u.clone(), exp.clone()))))
        }
        Factor::Pow(base, exp) if base.is_constant() => {
            found.push((exp.clone(), Expr::from(Factor::Pow(base.clone(), u.clone()))))
        }
        _ => {}
    }
    found.push((Expr::from(factor.clone()), u.clone()));
    found
}

/// ∫g(u(x))*u'(x) = G(u(x)), where the remaining factors must be a constant
/// multiple of `u'`.
fn substitution(factors: &[Factor], var: &Identifier, depth: usize) -> Option<Expr> {
    if depth >= MAX_DEPTH {
        return None;
    }
    let whole = Expr::from(factors.to_vec());
    let placeholder = Identifier::placeholder();
    let u = Expr::symbol(&placeholder);
    let x = Expr::symbol(var);
    for factor in factors {
        for (inner, outer) in candidates(factor, &u) {
            if inner == x || !inner.contains(var) {
                continue;
            }
            let Ok(du) = inner.derivative(var) else {
                continue;
            };
            if du.is_zero() {
                continue;
            }
            let rest = (whole.clone() * (Expr::from(factor.clone()) * du).recip()).simplify();
            if rest.contains(var) || rest.is_poisoned() {
                continue;
            }
            let Ok(g) = antiderivative(&outer, &placeholder, depth + 1) else {
                continue;
            };
            log::trace!("substituting {} = {} in {}", placeholder, inner, whole);
            return Some(rest * g.substitute(&placeholder, &inner));
        }
    }
    None
}

/// ∫u*dv = u*v - ∫v*du, with `u` a log or inverse trigonometric factor, or
/// else a power of `var`.
fn by_parts(factors: &[Factor], var: &Identifier, depth: usize) -> Option<Expr> {
    if depth >= MAX_DEPTH {
        return None;
    }
    let is_var = |e: &Expr| matches!(e.as_factor(), Some(Factor::Identifier(id)) if id == var);
    let chosen = factors
        .iter()
        .position(|f| {
            matches!(
                f,
                Factor::Func(Func::Log | Func::Asin | Func::Acos | Func::Atan, _)
            )
        })
        .or_else(|| {
            factors.iter().position(|f| match f {
                Factor::Identifier(id) => id == var,
                Factor::Pow(base, exp) => {
                    is_var(base) && exp.as_num().map_or(false, |k| k.is_integer() && k.is_pos())
                }
                _ => false,
            })
        })?;
    let u = Expr::from(factors[chosen].clone());
    let dv = Expr::from(
        factors
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != chosen)
            .map(|(_, f)| f.clone())
            .collect::<Vec<_>>(),
    );
    let v = antiderivative(&dv, var, depth + 1).ok()?;
    let du = u.derivative(var).ok()?;
    let rest = antiderivative(&(du * v.clone()).simplify(), var, depth + 1).ok()?;
    Some(u * v - rest)
}

#[cfg(test)]
mod tests {
    use num::complex::Complex64;

    use super::*;

    fn integral(s: &str) -> String {
        integrate(&s.parse().unwrap(), &Identifier::from('x'))
            .unwrap()
            .to_string()
    }

    /// The derivative of the result must match the integrand numerically.
    fn check(s: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let x = Identifier::from('x');
        let f = s.parse::<Expr>().unwrap();
        let result = integrate(&f, &x).unwrap_or_else(|e| panic!("{s}: {e}"));
        let derivative = result.derivative(&x).unwrap();
        for value in [0.3, 0.7, 1.3, 2.1] {
            let bindings = Bindings::from([(x.clone(), Complex64::new(value, 0.0))]);
            let expected = f.evaluate(&bindings).unwrap();
            let actual = derivative.evaluate(&bindings).unwrap();
            assert!(
                (expected - actual).norm() < 1e-8 * expected.norm().max(1.0),
                "{s}: d/dx {result} = {actual} != {expected} at {value}"
            );
        }
    }

    #[test]
    fn table_integrals() {
        assert_eq!(integral("x**2"), "x**3/3");
        assert_eq!(integral("5"), "5*x");
        assert_eq!(integral("1/(x**2 + 1)"), "atan(x)");
        check("3*x**2 + 2*x + 1");
        check("1/x");
        check("sqrt(x)");
        check("cos(3*x + 1)");
        check("exp(2*x)");
        check("2**x");
        check("sin(x)**2");
        check("1/(x**2 - 1)");
        check("1/(x**2 + 2*x + 1)");
        check("log(x)");
        check("atan(x)");
    }

    #[test]
    fn substitutions() {
        assert_eq!(integral("2*x*cos(x**2)"), "sin(x**2)");
        assert_eq!(integral("x*exp(x**2)"), "exp(x**2)/2");
        assert_eq!(integral("log(x)/x"), "log(x)**2/2");
        check("cos(x)*sin(x)**3");
        check("x/(x**2 + 1)");
    }

    #[test]
    fn by_parts() {
        check("x*sin(x)");
        check("x**2*exp(x)");
        check("x*log(x)");
        check("x*cos(2*x)");
    }

    #[test]
    fn no_antiderivative() {
        assert!(matches!(
            integrate(&"exp(x**2)".parse().unwrap(), &Identifier::from('x')),
            Err(Error::NoAntiderivative(_))
        ));
    }

    #[test]
    fn definite_integrals() {
        let x = Identifier::from('x');
        let definite = |f: &str, a: &str, b: &str| {
            integrate_definite(&f.parse().unwrap(), &x, &a.parse().unwrap(), &b.parse().unwrap())
        };
        assert_eq!(definite("x**2", "0", "1").unwrap().to_string(), "1/3");
        assert_eq!(definite("sin(x)", "0", "pi").unwrap().to_string(), "2");
        assert_eq!(definite("exp(-x)", "0", "oo").unwrap().to_string(), "1");
        assert_eq!(definite("1/x**2", "1", "oo").unwrap().to_string(), "1");
        assert!(matches!(definite("1/x", "-1", "1"), Err(Error::Undefined)));
    }
}
