//! Finite sums and products over an integer index.

use num::{BigInt, ToPrimitive};
use rayon::prelude::*;

use crate::{cancel, Error, Expr, Expression, Identifier, Result};

/// Largest number of terms a sum or product may have.
pub const MAX_TERMS: u64 = 10_000;
/// Largest coefficient, in bits, a running sum or product may hold.
pub const MAX_RESULT_BITS: u64 = 200_000;
/// Largest number of terms a running sum may hold.
pub const MAX_RESULT_TERMS: usize = 2_048;

/// `expr` summed over `var` from `lower` to `upper` inclusive.
pub fn sum(expr: &Expr, var: &Identifier, lower: &Expr, upper: &Expr) -> Result<Expr> {
    #[cfg(feature = "tracy")]
    profiling::scope!("sum");
    let terms = instances(expr, var, lower, upper)?;
    let total = terms
        .into_par_iter()
        .map(Ok)
        .try_reduce(Expr::zero, |a, b| bounded((a + b).simplify()))?;
    log::debug!("sum of {} over {} = {}", expr, var, total);
    Ok(total)
}

/// `expr` multiplied over `var` from `lower` to `upper` inclusive.
pub fn product(expr: &Expr, var: &Identifier, lower: &Expr, upper: &Expr) -> Result<Expr> {
    #[cfg(feature = "tracy")]
    profiling::scope!("product");
    let factors = instances(expr, var, lower, upper)?;
    let total = factors
        .into_par_iter()
        .map(Ok)
        .try_reduce(Expr::one, |a, b| bounded((a * b).simplify()))?;
    log::debug!("product of {} over {} = {}", expr, var, total);
    Ok(total)
}

/// `expr` with `var` replaced by each index of the range, simplified. An
/// empty range gives no instances.
fn instances(expr: &Expr, var: &Identifier, lower: &Expr, upper: &Expr) -> Result<Vec<Expr>> {
    let lower = bound(lower)?;
    let upper = bound(upper)?;
    if upper < lower {
        return Ok(Vec::new());
    }
    let count = (&upper - &lower + 1u32)
        .to_u64()
        .filter(|n| *n <= MAX_TERMS)
        .ok_or_else(|| Error::RangeTooLarge(format!("a range of {} terms", &upper - &lower + 1u32)))?;
    let start = lower
        .to_i64()
        .ok_or_else(|| Error::RangeTooLarge(format!("the bound {}", lower)))?;
    let expr = expr.simplify();
    let values = (0..count as i64)
        .into_par_iter()
        .map(|i| {
            cancel::check()?;
            bounded(expr.substitute(var, &Expr::number(start + i)).simplify())
        })
        .collect::<Result<Vec<Expr>>>()?;
    if values.iter().any(|v| v.is_poisoned()) {
        return Err(Error::Undefined);
    }
    Ok(values)
}

/// Stops a running sum or product that was cancelled or outgrew the limits.
fn bounded(partial: Expr) -> Result<Expr> {
    cancel::check()?;
    let bits = partial
        .terms
        .iter()
        .map(|t| t.coeff.bits())
        .max()
        .unwrap_or(0);
    if bits > MAX_RESULT_BITS || partial.terms.len() > MAX_RESULT_TERMS {
        return Err(Error::RangeTooLarge(String::from("the accumulated result")));
    }
    Ok(partial)
}

fn bound(expr: &Expr) -> Result<BigInt> {
    let expr = expr.simplify();
    if expr.as_infinity().is_some() {
        return Err(Error::Unsupported(String::from("infinite series")));
    }
    expr.as_num()
        .and_then(|n| n.to_integer())
        .ok_or_else(|| Error::Unsupported(format!("non-integer bound `{}`", expr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn over(f: fn(&Expr, &Identifier, &Expr, &Expr) -> Result<Expr>, s: &str, a: &str, b: &str) -> Result<String> {
        f(
            &s.parse().unwrap(),
            &Identifier::from('n'),
            &a.parse().unwrap(),
            &b.parse().unwrap(),
        )
        .map(|e| e.to_string())
    }

    #[test]
    fn sums() {
        assert_eq!(over(sum, "n", "1", "10").unwrap(), "55");
        assert_eq!(over(sum, "1/n**2", "1", "3").unwrap(), "49/36");
        assert_eq!(over(sum, "x**n", "0", "2").unwrap(), "x**2 + x + 1");
        assert_eq!(over(sum, "n", "5", "1").unwrap(), "0");
    }

    #[test]
    fn products() {
        assert_eq!(over(product, "n", "1", "5").unwrap(), "120");
        assert_eq!(over(product, "2", "1", "10").unwrap(), "1024");
        assert_eq!(over(product, "n", "3", "2").unwrap(), "1");
    }

    #[test]
    fn rejected_ranges() {
        assert!(matches!(over(sum, "n", "1", "oo"), Err(Error::Unsupported(_))));
        assert!(matches!(over(sum, "n", "1", "1/2"), Err(Error::Unsupported(_))));
        assert!(matches!(over(sum, "n", "1", "100000"), Err(Error::RangeTooLarge(_))));
        assert!(matches!(over(sum, "1/n", "0", "3"), Err(Error::Undefined)));
    }

    #[test]
    fn runaway_accumulators_stop() {
        assert!(matches!(over(product, "n**n", "1", "5000"), Err(Error::RangeTooLarge(_))));
        assert!(matches!(over(sum, "x**n", "1", "5000"), Err(Error::RangeTooLarge(_))));
        assert_eq!(over(product, "n**n", "1", "4").unwrap(), "27648");
    }

    #[test]
    fn cancelled_series_stop() {
        let token = cancel::CancelToken::new();
        token.cancel();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .start_handler({
                let token = token.clone();
                move |_| token.attach()
            })
            .build()
            .unwrap();
        let result = pool.install(|| over(sum, "n", "1", "100"));
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
