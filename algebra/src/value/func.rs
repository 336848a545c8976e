use std::fmt::Display;

use num::complex::Complex64;

use crate::{Constant, Expr, Expression, Factor, Fraction};

/// Factorials above this operand stay symbolic.
pub const FACTORIAL_LIMIT: u64 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Log,
    Abs,
    Factorial,
}

impl Func {
    pub fn from_str(string: &str) -> Option<Self> {
        match string {
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "cot" => Some(Func::Cot),
            "asin" => Some(Func::Asin),
            "acos" => Some(Func::Acos),
            "atan" => Some(Func::Atan),
            "sinh" => Some(Func::Sinh),
            "cosh" => Some(Func::Cosh),
            "tanh" => Some(Func::Tanh),
            "log" => Some(Func::Log),
            "abs" => Some(Func::Abs),
            "factorial" => Some(Func::Factorial),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Cot => "cot",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Log => "log",
            Func::Abs => "abs",
            Func::Factorial => "factorial",
        }
    }

    pub fn evaluate(&self, z: Complex64) -> Complex64 {
        match self {
            Func::Sin => z.sin(),
            Func::Cos => z.cos(),
            Func::Tan => z.tan(),
            Func::Cot => z.tan().inv(),
            Func::Asin => z.asin(),
            Func::Acos => z.acos(),
            Func::Atan => z.atan(),
            Func::Sinh => z.sinh(),
            Func::Cosh => z.cosh(),
            Func::Tanh => z.tanh(),
            Func::Log => z.ln(),
            Func::Abs => Complex64::new(z.norm(), 0.0),
            Func::Factorial => {
                if z.im == 0.0 && z.re >= 0.0 && z.re.fract() == 0.0 && z.re <= 170.0 {
                    Complex64::new((2..=z.re as u64).map(|k| k as f64).product(), 0.0)
                } else {
                    Complex64::new(f64::NAN, 0.0)
                }
            }
        }
    }

    const fn is_odd(&self) -> bool {
        matches!(
            self,
            Func::Sin | Func::Tan | Func::Cot | Func::Asin | Func::Atan | Func::Sinh | Func::Tanh
        )
    }

    const fn is_even(&self) -> bool {
        matches!(self, Func::Cos | Func::Cosh | Func::Abs)
    }

    /// Exact value of the function at a simplified argument, when one is known.
    pub fn apply(&self, arg: &Expr) -> Option<Expr> {
        #[cfg(feature = "tracy")]
        profiling::scope!("Func::apply");
        if arg.is_poisoned() {
            return Some(Expr::from(Factor::Const(Constant::NaN)));
        }
        if let Some(k) = pi_multiple(arg) {
            if let Some(value) = self.at_pi_multiple(&k) {
                return Some(value);
            }
        }
        if let Some(n) = arg.as_num() {
            if let Some(value) = self.at_number(&n) {
                return Some(value);
            }
        }
        if let [term] = arg.terms.as_slice() {
            if term.coeff.is_neg() {
                let positive = -arg.clone();
                if self.is_odd() {
                    return Some(-Expr::from(Factor::Func(*self, positive)));
                } else if self.is_even() {
                    return Some(Expr::from(Factor::Func(*self, positive)));
                }
            }
        }
        match (self, arg.terms.as_slice()) {
            // log(E**u) = u
            (Func::Log, [term]) if term.coeff.is_one() => match term.factors.as_slice() {
                [Factor::Const(Constant::E)] => Some(Expr::one()),
                [Factor::Pow(base, exp)] if base.is_constant_e() => Some(exp.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    fn at_pi_multiple(&self, k: &Fraction) -> Option<Expr> {
        let twelfths = (k.clone() * Fraction::whole(12)).to_i64()?;
        let step = twelfths.rem_euclid(24);
        let sin = |m: i64| sin_table(m.rem_euclid(24));
        match self {
            Func::Sin => sin(step),
            Func::Cos => sin(step + 6),
            Func::Tan => ratio(sin(step)?, sin(step + 6)?),
            Func::Cot => ratio(sin(step + 6)?, sin(step)?),
            _ => None,
        }
    }

    fn at_number(&self, n: &Fraction) -> Option<Expr> {
        let pi_times = |k: Fraction| Expr::from((k, Factor::Const(Constant::Pi)));
        let value = match self {
            Func::Sin | Func::Tan | Func::Asin | Func::Atan | Func::Sinh | Func::Tanh
                if n.is_zero() =>
            {
                Expr::zero()
            }
            Func::Cos | Func::Cosh if n.is_zero() => Expr::one(),
            Func::Cot if n.is_zero() => Expr::from(Factor::Const(Constant::ComplexInfinity)),
            Func::Log if n.is_one() => Expr::zero(),
            Func::Log if n.is_zero() => Expr::from(Factor::Const(Constant::ComplexInfinity)),
            Func::Abs => Expr::from(n.abs()),
            Func::Asin if n.abs() == Fraction::new(1, 2) => pi_times(Fraction::new(1, 6).mul_sign(n.sign())),
            Func::Asin if n.abs().is_one() => pi_times(Fraction::new(1, 2).mul_sign(n.sign())),
            Func::Acos if n.is_zero() => pi_times(Fraction::new(1, 2)),
            Func::Acos if n.is_one() => Expr::zero(),
            Func::Acos if *n == Fraction::neg_one() => pi_times(Fraction::one()),
            Func::Acos if *n == Fraction::new(1, 2) => pi_times(Fraction::new(1, 3)),
            Func::Acos if *n == Fraction::new(-1, 2) => pi_times(Fraction::new(2, 3)),
            Func::Atan if n.abs().is_one() => pi_times(Fraction::new(1, 4).mul_sign(n.sign())),
            Func::Factorial => {
                if n.is_integer() && n.is_neg() {
                    Expr::from(Factor::Const(Constant::ComplexInfinity))
                } else {
                    Expr::from(n.factorial(FACTORIAL_LIMIT)?)
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

/// `k` such that `arg == k*pi`.
fn pi_multiple(arg: &Expr) -> Option<Fraction> {
    match arg.terms.as_slice() {
        [] => Some(Fraction::zero()),
        [term] if matches!(term.factors.as_slice(), [Factor::Const(Constant::Pi)]) => {
            Some(term.coeff.clone())
        }
        _ => None,
    }
}

/// sin(m * 15°) for the angles with a simple closed form.
fn sin_table(m: i64) -> Option<Expr> {
    if m >= 12 {
        return sin_table(m - 12).map(|e| -e);
    }
    let half_root = |n: i64| {
        Expr::from((
            Fraction::new(1, 2),
            Factor::Pow(Expr::from(Fraction::whole(n)), Expr::from(Fraction::new(1, 2))),
        ))
    };
    match m {
        0 => Some(Expr::zero()),
        2 | 10 => Some(Expr::from(Fraction::new(1, 2))),
        3 | 9 => Some(half_root(2)),
        4 | 8 => Some(half_root(3)),
        6 => Some(Expr::one()),
        _ => None,
    }
}

fn ratio(num: Expr, den: Expr) -> Option<Expr> {
    if den.is_zero() {
        return Some(Expr::from(Factor::Const(Constant::ComplexInfinity)));
    }
    Some((num * den.recip()).simplify())
}

impl Display for Func {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
