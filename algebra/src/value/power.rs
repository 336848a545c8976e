//! Construction of canonical powers.

use num::{BigInt, ToPrimitive};

use crate::{value::term::distribute, Constant, Expr, Expression, Factor, Fraction, Func, Sign, Term};

/// Largest root index extracted exactly.
const MAX_ROOT_INDEX: u32 = 64;

/// `base ** exp` for simplified operands. The result may need another
/// simplification pass when it multiplies several parts together.
pub fn make_power(base: &Expr, exp: &Expr) -> Expr {
    #[cfg(feature = "tracy")]
    profiling::scope!("make_power");
    if exp.is_zero() {
        return Expr::one();
    }
    if exp.is_one() {
        return base.clone();
    }
    if base.is_constant_of(Constant::NaN) || exp.is_constant_of(Constant::NaN) {
        return Expr::constant(Constant::NaN);
    }
    if let (Some(b), Some(e)) = (base.as_num(), exp.as_num()) {
        return number_power(&b, &e);
    }
    if let Some(result) = exceptional_power(base, exp) {
        return result;
    }

    let integer = exp.as_num().filter(|e| e.is_integer());
    if let [term] = base.terms.as_slice() {
        if let (Some(n), Some(Factor::Const(Constant::I))) = (&integer, base.as_factor()) {
            // I**n cycles with period four
            let n = (n.n() % BigInt::from(4)).to_i64().unwrap_or(0).rem_euclid(4);
            return match n {
                0 => Expr::one(),
                1 => Expr::constant(Constant::I),
                2 => Expr::number(-1),
                _ => -Expr::constant(Constant::I),
            };
        }
        // E**log(u) = u
        if base.is_constant_e() {
            if let Some(Factor::Func(Func::Log, u)) = exp.as_factor() {
                return u.clone();
            }
        }
        if let Some(n) = integer {
            let distribute_over = !term.coeff.is_one()
                || term.factors.len() > 1
                || matches!(term.factors.as_slice(), [Factor::Pow(..)]);
            if distribute_over {
                let mut parts = vec![number_power(&term.coeff, &n)];
                for factor in &term.factors {
                    let (b, e) = factor.as_power();
                    parts.push(make_power(&b, &e.scale(&n).simplify()));
                }
                return product(parts);
            }
        } else if let Some(e) = exp.as_num() {
            // sqrt(4*x) = 2*sqrt(x)
            if !term.coeff.abs().is_one() && !term.factors.is_empty() {
                let inner = Expr::from(Term {
                    coeff: Fraction::one().mul_sign(term.coeff.sign()),
                    factors: term.factors.clone(),
                });
                return product(vec![number_power(&term.coeff.abs(), &e), make_power(&inner, exp)]);
            }
        }
    }
    Expr::from(Factor::Pow(base.clone(), exp.clone()))
}

fn product(parts: Vec<Expr>) -> Expr {
    Expr::from(distribute(Fraction::one(), parts))
}

fn symbolic(base: &Fraction, exp: &Fraction) -> Expr {
    Expr::from(Factor::Pow(Expr::from(base.clone()), Expr::from(exp.clone())))
}

/// Exact `base ** exp` for rational operands, extracting perfect powers from
/// roots: `8**(1/2) = 2*sqrt(2)`, `(1/2)**(1/2) = sqrt(2)/2`.
pub(crate) fn number_power(base: &Fraction, exp: &Fraction) -> Expr {
    if let Some(n) = exp.to_i64() {
        return match base.pow(n) {
            Some(value) => Expr::from(value),
            None if base.is_zero() => Expr::constant(Constant::ComplexInfinity),
            None => symbolic(base, exp),
        };
    }
    if base.is_zero() {
        return if exp.is_pos() {
            Expr::zero()
        } else {
            Expr::constant(Constant::ComplexInfinity)
        };
    }
    if base.is_one() {
        return Expr::one();
    }
    let (Some(p), Some(q)) = (exp.n().to_i64(), exp.d().to_u32()) else {
        return symbolic(base, exp);
    };
    if q > MAX_ROOT_INDEX {
        return symbolic(base, exp);
    }
    let Some(m) = base.pow(p) else {
        return symbolic(base, exp);
    };
    if m.is_neg() {
        return match q {
            2 => product(vec![
                Expr::constant(Constant::I),
                number_power(&m.abs(), &Fraction::new(1, 2)),
            ]),
            q if q % 2 == 1 => -number_power(&m.abs(), &Fraction::new(1, q as i64)),
            _ => symbolic(base, exp),
        };
    }
    match m.extract_root(q) {
        Some((outside, inside)) if num::One::is_one(&inside) => Expr::from(outside),
        Some((outside, inside)) => Expr::from((
            outside,
            Factor::Pow(
                Expr::from(Fraction::from_integer(inside)),
                Expr::from(Fraction::new(1, q as i64)),
            ),
        )),
        None => symbolic(base, exp),
    }
}

/// Powers involving `oo` and `zoo`.
fn exceptional_power(base: &Expr, exp: &Expr) -> Option<Expr> {
    let sign_of = |e: &Expr| e.as_num().map(|n| (n.is_pos(), n.is_neg()));
    if base.is_constant_of(Constant::ComplexInfinity) || base.is_constant_of(Constant::Infinity) {
        let infinite = if base.is_constant_of(Constant::Infinity) {
            Constant::Infinity
        } else {
            Constant::ComplexInfinity
        };
        return Some(match sign_of(exp) {
            Some((true, _)) => Expr::constant(infinite),
            Some((_, true)) => Expr::zero(),
            _ => Expr::constant(Constant::NaN),
        });
    }
    if let Some(sign) = exp.as_infinity() {
        let magnitude = if base.is_constant_e() {
            Some(Fraction::whole(2))
        } else {
            base.as_num().map(|n| n.abs())
        };
        let grows = match magnitude {
            Some(m) if m > Fraction::one() => sign == Sign::Pos,
            Some(m) if m < Fraction::one() => sign == Sign::Neg,
            Some(_) => return Some(Expr::constant(Constant::NaN)),
            None => return None,
        };
        return Some(if grows {
            Expr::constant(Constant::Infinity)
        } else {
            Expr::zero()
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(base: Fraction, exp: Fraction) -> String {
        let mut e = number_power(&base, &exp);
        e = e.simplify();
        e.to_string()
    }

    #[test]
    fn rational_powers() {
        assert_eq!(show(Fraction::whole(2), Fraction::whole(10)), "1024");
        assert_eq!(show(Fraction::whole(2), Fraction::whole(-2)), "1/4");
        assert_eq!(show(Fraction::whole(2), Fraction::new(3, 2)), "2*sqrt(2)");
        assert_eq!(show(Fraction::whole(-8), Fraction::new(1, 3)), "-2");
        assert_eq!(show(Fraction::whole(-2), Fraction::new(1, 2)), "sqrt(2)*I");
        assert_eq!(show(Fraction::whole(12), Fraction::new(1, 2)), "2*sqrt(3)");
        assert_eq!(show(Fraction::zero(), Fraction::whole(-1)), "zoo");
    }

    #[test]
    fn symbolic_powers() {
        let x = Expr::from(crate::Identifier::from('x'));
        assert_eq!(make_power(&x, &Expr::number(2)).to_string(), "x**2");
        assert_eq!(make_power(&x, &Expr::one()), x);
        assert_eq!(make_power(&x, &Expr::zero()), Expr::one());
        let e_to_oo = make_power(&Expr::constant(Constant::E), &-Expr::constant(Constant::Infinity));
        assert!(e_to_oo.is_zero());
    }
}
