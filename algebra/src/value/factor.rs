use std::{collections::BTreeSet, fmt::Display};

use num::{complex::Complex64, Integer};

use crate::{
    make_power, Bindings, Constant, Error, Expr, Expression, Fraction, Func, Identifier, Result,
    Term, ToTerm,
};

/// Integer powers of sums up to this exponent are multiplied out by `expand`.
pub const MAX_EXPAND_POWER: i64 = 32;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    Identifier(Identifier),
    Const(Constant),
    Group(Expr),
    Func(Func, Expr),
    Pow(Expr, Expr),
}

impl Factor {
    pub fn identifier(id: impl Into<Identifier>) -> Factor {
        Factor::Identifier(id.into())
    }
    pub fn group(expr: impl Into<Expr>) -> Factor {
        Factor::Group(expr.into())
    }
    pub fn function(func: Func, expr: impl Into<Expr>) -> Factor {
        Factor::Func(func, expr.into())
    }
    pub fn pow(base: impl Into<Expr>, exponent: impl Into<Expr>) -> Factor {
        Factor::Pow(base.into(), exponent.into())
    }

    /// The factor as `base ** exp`.
    pub fn as_power(&self) -> (Expr, Expr) {
        match self {
            Factor::Pow(base, exp) => (base.clone(), exp.clone()),
            Factor::Group(expr) => (expr.clone(), Expr::one()),
            factor => (Expr::from(factor.clone()), Expr::one()),
        }
    }

    pub fn is_denominator(&self) -> bool {
        matches!(self, Factor::Pow(base, exp) if !base.is_constant_e() && exp.is_negative())
    }

    /// `1/self` for factors shown under a fraction bar.
    pub fn reciprocal(&self) -> Option<Factor> {
        match self {
            Factor::Pow(base, exp) if self.is_denominator() => {
                let exp = -exp.clone();
                if exp.is_one() {
                    Some(match base.as_factor() {
                        Some(factor) => factor.clone(),
                        None => Factor::Group(base.clone()),
                    })
                } else {
                    Some(Factor::Pow(base.clone(), exp))
                }
            }
            _ => None,
        }
    }

    pub fn degree(&self) -> Fraction {
        if self.is_constant() {
            return Fraction::zero();
        }
        match self {
            Factor::Pow(base, exp) if !base.is_constant() => {
                exp.as_num().unwrap_or_else(Fraction::one)
            }
            _ => Fraction::one(),
        }
    }

    pub(crate) fn sort_key(&self) -> (u8, String, String) {
        let rank = match self {
            Factor::Pow(base, _) if base.as_num().is_some() => 0,
            Factor::Const(_) => 1,
            Factor::Pow(base, _) if base.is_constant_e() => 3,
            Factor::Identifier(_) => 2,
            Factor::Pow(base, _) if matches!(base.as_factor(), Some(Factor::Identifier(_))) => 2,
            Factor::Pow(base, _) if base.is_constant() => 1,
            _ => 3,
        };
        let base = match self {
            Factor::Pow(base, _) => base.to_string(),
            factor => factor.to_string(),
        };
        (rank, base, self.to_string())
    }

    pub fn simplify(&self) -> Expr {
        match self {
            Factor::Identifier(_) | Factor::Const(_) => Expr::from(self.clone()),
            Factor::Group(expr) => expr.simplify(),
            Factor::Func(func, arg) => {
                let arg = arg.simplify();
                match func.apply(&arg) {
                    Some(value) => value.simplify(),
                    None => Expr::from(Factor::Func(*func, arg)),
                }
            }
            Factor::Pow(base, exp) => make_power(&base.simplify(), &exp.simplify()),
        }
    }

    pub fn expand(&self) -> Expr {
        match self {
            Factor::Group(expr) => expr.expand(),
            Factor::Pow(base, exp) => {
                let base = base.expand();
                match exp.as_num().and_then(|n| n.to_i64()) {
                    Some(n) if (2..=MAX_EXPAND_POWER).contains(&n) && base.terms.len() > 1 => {
                        (1..n).fold(base.clone(), |acc, _| {
                            Expr::from(
                                acc.terms
                                    .iter()
                                    .flat_map(|a| {
                                        base.terms.iter().map(move |b| {
                                            let mut t = a.clone();
                                            t.mul(b.clone());
                                            t
                                        })
                                    })
                                    .collect::<Vec<Term>>(),
                            )
                            .simplify()
                        })
                    }
                    _ => Expr::from(Factor::Pow(base, exp.clone())),
                }
            }
            factor => Expr::from(factor.clone()),
        }
    }

    fn evaluate_pow(base: &Expr, exp: &Expr, bindings: &Bindings) -> Result<Complex64> {
        let b = base.evaluate(bindings)?;
        if let Some(r) = exp.as_num() {
            if let Some(n) = r.to_i64().and_then(|n| i32::try_from(n).ok()) {
                return Ok(b.powi(n));
            }
            if b.im == 0.0 {
                let e = r.to_f64();
                if b.re >= 0.0 {
                    return Ok(Complex64::new(b.re.powf(e), 0.0));
                }
                // Odd roots of negative numbers stay real.
                if r.d().is_odd() {
                    let magnitude = (-b.re).powf(e);
                    let value = if r.n().is_odd() { -magnitude } else { magnitude };
                    return Ok(Complex64::new(value, 0.0));
                }
            }
        }
        let e = exp.evaluate(bindings)?;
        if b.im == 0.0 && e.im == 0.0 && b.re > 0.0 {
            Ok(Complex64::new(b.re.powf(e.re), 0.0))
        } else if b == Complex64::new(0.0, 0.0) {
            Ok(if e.re > 0.0 {
                Complex64::new(0.0, 0.0)
            } else {
                Complex64::new(f64::INFINITY, 0.0)
            })
        } else {
            Ok(b.powc(e))
        }
    }
}

fn product(coeff: i64, factors: Vec<Factor>) -> Expr {
    Expr::from((Fraction::whole(coeff), factors).term())
}

fn sum(terms: Vec<Term>) -> Expr {
    Expr::from(terms)
}

impl From<Identifier> for Factor {
    fn from(identifier: Identifier) -> Self {
        Factor::Identifier(identifier)
    }
}

impl From<Constant> for Factor {
    fn from(constant: Constant) -> Self {
        Factor::Const(constant)
    }
}

impl Expression for Factor {
    fn evaluate(&self, bindings: &Bindings) -> Result<Complex64> {
        match self {
            Factor::Identifier(id) => bindings
                .get(id)
                .copied()
                .ok_or_else(|| Error::FreeSymbol(id.clone())),
            Factor::Const(c) => Ok(c.value()),
            Factor::Group(expr) => expr.evaluate(bindings),
            Factor::Func(f, arg) => Ok(f.evaluate(arg.evaluate(bindings)?)),
            Factor::Pow(a, b) => Factor::evaluate_pow(a, b, bindings),
        }
    }

    fn derivative(&self, by: &Identifier) -> Result<Expr> {
        match self {
            Factor::Const(_) => Ok(Expr::zero()),
            Factor::Identifier(id) => Ok(if by == id { Expr::one() } else { Expr::zero() }),
            Factor::Group(group) => group.derivative(by),
            Factor::Func(f, arg) => {
                let inner = arg.derivative(by)?;
                if inner.is_zero() {
                    return Ok(Expr::zero());
                }
                let inner = Factor::Group(inner);
                let func = |f: Func| Factor::Func(f, arg.clone());
                let squared = |factor: Factor| Factor::Pow(Expr::from(factor), Expr::number(2));
                Ok(match f {
                    // D(sin(f(x))) = f'(x) * cos(f(x))
                    Func::Sin => product(1, vec![inner, func(Func::Cos)]),
                    // D(cos(f(x))) = -f'(x) * sin(f(x))
                    Func::Cos => product(-1, vec![inner, func(Func::Sin)]),
                    // D(tan(f(x))) = f'(x) * (tan(f(x))^2 + 1)
                    Func::Tan => product(
                        1,
                        vec![
                            inner,
                            Factor::Group(sum(vec![squared(func(Func::Tan)).term(), 1i64.term()])),
                        ],
                    ),
                    // D(cot(f(x))) = -f'(x) * (cot(f(x))^2 + 1)
                    Func::Cot => product(
                        -1,
                        vec![
                            inner,
                            Factor::Group(sum(vec![squared(func(Func::Cot)).term(), 1i64.term()])),
                        ],
                    ),
                    // D(asin(f(x))) = f'(x) / sqrt(1 - f(x)^2)
                    Func::Asin => product(
                        1,
                        vec![
                            inner,
                            Factor::Pow(
                                sum(vec![
                                    1i64.term(),
                                    (Fraction::neg_one(), squared(Factor::Group(arg.clone()))).term(),
                                ]),
                                Expr::from(Fraction::new(-1, 2)),
                            ),
                        ],
                    ),
                    // D(acos(f(x))) = -f'(x) / sqrt(1 - f(x)^2)
                    Func::Acos => product(
                        -1,
                        vec![
                            inner,
                            Factor::Pow(
                                sum(vec![
                                    1i64.term(),
                                    (Fraction::neg_one(), squared(Factor::Group(arg.clone()))).term(),
                                ]),
                                Expr::from(Fraction::new(-1, 2)),
                            ),
                        ],
                    ),
                    // D(atan(f(x))) = f'(x) / (1 + f(x)^2)
                    Func::Atan => product(
                        1,
                        vec![
                            inner,
                            Factor::Pow(
                                sum(vec![1i64.term(), squared(Factor::Group(arg.clone())).term()]),
                                Expr::number(-1),
                            ),
                        ],
                    ),
                    // D(sinh(f(x))) = f'(x) * cosh(f(x))
                    Func::Sinh => product(1, vec![inner, func(Func::Cosh)]),
                    // D(cosh(f(x))) = f'(x) * sinh(f(x))
                    Func::Cosh => product(1, vec![inner, func(Func::Sinh)]),
                    // D(tanh(f(x))) = f'(x) * (1 - tanh(f(x))^2)
                    Func::Tanh => product(
                        1,
                        vec![
                            inner,
                            Factor::Group(sum(vec![
                                1i64.term(),
                                (Fraction::neg_one(), squared(func(Func::Tanh))).term(),
                            ])),
                        ],
                    ),
                    // D(log(f(x))) = f'(x) / f(x)
                    Func::Log => product(1, vec![inner, Factor::Pow(arg.clone(), Expr::number(-1))]),
                    // D(|f(x)|) = f'(x) * f(x) / |f(x)|
                    Func::Abs => product(
                        1,
                        vec![
                            inner,
                            Factor::Group(arg.clone()),
                            Factor::Pow(Expr::from(func(Func::Abs)), Expr::number(-1)),
                        ],
                    ),
                    Func::Factorial => return Err(Error::NotDifferentiable(self.to_string())),
                })
            }
            Factor::Pow(a, b) => {
                let a_der = a.derivative(by)?;
                let b_der = b.derivative(by)?;
                let b_minus_one = b.clone() - Expr::one();

                Ok(match (a_der.is_zero(), b_der.is_zero()) {
                    (true, true) => Expr::zero(),
                    // D(f(x)^c) = c * f(x)^(c - 1) * f'(x)
                    (false, true) => product(
                        1,
                        vec![
                            Factor::Group(b.clone()),
                            Factor::Pow(a.clone(), b_minus_one),
                            Factor::Group(a_der),
                        ],
                    ),
                    // D(c^g(x)) = ln(c) * c^g(x) * g'(x)
                    (true, false) => product(
                        1,
                        vec![
                            Factor::Func(Func::Log, a.clone()),
                            Factor::Pow(a.clone(), b.clone()),
                            Factor::Group(b_der),
                        ],
                    ),
                    // D(f^g) = f^(g - 1) * (g * f' + f * ln(f) * g')
                    (false, false) => product(
                        1,
                        vec![
                            Factor::Pow(a.clone(), b_minus_one),
                            Factor::Group(sum(vec![
                                vec![Factor::Group(b.clone()), Factor::Group(a_der)].term(),
                                vec![
                                    Factor::Group(a.clone()),
                                    Factor::Func(Func::Log, a.clone()),
                                    Factor::Group(b_der),
                                ]
                                .term(),
                            ])),
                        ],
                    ),
                })
            }
        }
    }

    fn substitute(&self, id: &Identifier, value: &Expr) -> Self {
        match self {
            Factor::Identifier(i) if i == id => Factor::Group(value.clone()),
            Factor::Identifier(_) | Factor::Const(_) => self.clone(),
            Factor::Group(expr) => Factor::Group(expr.substitute(id, value)),
            Factor::Func(f, arg) => Factor::Func(*f, arg.substitute(id, value)),
            Factor::Pow(a, b) => Factor::Pow(a.substitute(id, value), b.substitute(id, value)),
        }
    }

    fn as_num(&self) -> Option<Fraction> {
        match self {
            Factor::Group(expr) => expr.as_num(),
            _ => None,
        }
    }

    fn collect_identifiers(&self, into: &mut BTreeSet<Identifier>) {
        match self {
            Factor::Identifier(id) => {
                into.insert(id.clone());
            }
            Factor::Const(_) => {}
            Factor::Group(expr) | Factor::Func(_, expr) => expr.collect_identifiers(into),
            Factor::Pow(a, b) => {
                a.collect_identifiers(into);
                b.collect_identifiers(into);
            }
        }
    }

    fn any<P: Fn(&Factor) -> bool>(&self, pred: &P) -> bool {
        pred(self)
            || match self {
                Factor::Identifier(_) | Factor::Const(_) => false,
                Factor::Group(expr) | Factor::Func(_, expr) => expr.any(pred),
                Factor::Pow(a, b) => a.any(pred) || b.any(pred),
            }
    }

    fn depth(&self) -> usize {
        match self {
            Factor::Identifier(_) | Factor::Const(_) => 1,
            Factor::Group(expr) | Factor::Func(_, expr) => expr.depth() + 1,
            Factor::Pow(a, b) => a.depth().max(b.depth()) + 1,
        }
    }
}

impl Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factor::Identifier(id) => write!(f, "{}", id),
            Factor::Const(c) => write!(f, "{}", c),
            Factor::Group(expr) => write!(f, "({})", expr),
            Factor::Func(func, arg) => write!(f, "{}({})", func, arg),
            Factor::Pow(base, exp) => {
                if base.is_constant_e() {
                    return write!(f, "exp({})", exp);
                }
                if exp.as_num() == Some(Fraction::new(1, 2)) {
                    return write!(f, "sqrt({})", base);
                }
                if base.is_atomic() {
                    write!(f, "{}", base)?;
                } else {
                    write!(f, "({})", base)?;
                }
                let simple_exp = match exp.as_num() {
                    Some(n) => n.is_integer() && !n.is_neg(),
                    None => matches!(
                        exp.as_factor(),
                        Some(Factor::Identifier(_) | Factor::Const(_))
                    ),
                };
                if simple_exp {
                    write!(f, "**{}", exp)
                } else {
                    write!(f, "**({})", exp)
                }
            }
        }
    }
}
