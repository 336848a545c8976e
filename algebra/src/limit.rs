//! Limits of one-variable expressions.
//!
//! A limit is tried by direct substitution first, then by comparing degrees at
//! infinity, then by splitting the expression into a quotient and applying
//! L'Hôpital's rule, and last by numeric probing near the point.

use std::{
    f64::consts::{E, PI},
    fmt::{self, Display},
};

use crate::{
    cancel,
    poly::Poly, solve::clear_denominators, Bindings, Constant, Error, Expr, Expression, Factor,
    Fraction, Identifier, Result, Sign,
};

/// Rounds of L'Hôpital's rule before falling back to probing.
const MAX_LHOPITAL: usize = 6;
/// Probes use offsets `10**-k` (or points `10**k`) for these `k`.
const PROBE_EXPONENTS: std::ops::RangeInclusive<i32> = 2..=8;
/// Relative tolerance for recognizing a probed value.
const RECOGNIZE_TOLERANCE: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Both,
    Plus,
    Minus,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Direction> {
        match s {
            "" | "+-" => Some(Direction::Both),
            "+" => Some(Direction::Plus),
            "-" => Some(Direction::Minus),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Both => "",
            Direction::Plus => "+",
            Direction::Minus => "-",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LimitPoint {
    Finite(Expr),
    Infinity(Sign),
}

impl LimitPoint {
    pub fn from_expr(expr: &Expr) -> LimitPoint {
        let expr = expr.simplify();
        match expr.as_infinity() {
            Some(sign) => LimitPoint::Infinity(sign),
            None => LimitPoint::Finite(expr),
        }
    }

    fn to_expr(&self) -> Expr {
        match self {
            LimitPoint::Finite(expr) => expr.clone(),
            LimitPoint::Infinity(Sign::Pos) => Expr::constant(Constant::Infinity),
            LimitPoint::Infinity(Sign::Neg) => -Expr::constant(Constant::Infinity),
        }
    }
}

impl Display for LimitPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LimitValue {
    Exact(Expr),
    Infinite(Sign),
    /// A numeric value that was not recognized as a closed form.
    Approx(f64),
}

impl LimitValue {
    pub fn to_expr(&self) -> Option<Expr> {
        match self {
            LimitValue::Exact(expr) => Some(expr.clone()),
            LimitValue::Infinite(Sign::Pos) => Some(Expr::constant(Constant::Infinity)),
            LimitValue::Infinite(Sign::Neg) => Some(-Expr::constant(Constant::Infinity)),
            LimitValue::Approx(_) => None,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            LimitValue::Exact(expr) => expr.is_zero(),
            LimitValue::Infinite(_) => false,
            LimitValue::Approx(v) => v.abs() < 1e-12,
        }
    }

    fn is_infinite(&self) -> bool {
        matches!(self, LimitValue::Infinite(_))
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            LimitValue::Exact(expr) => expr
                .evaluate(&Bindings::new())
                .ok()
                .filter(|z| z.im.abs() < 1e-12)
                .map(|z| z.re),
            LimitValue::Infinite(_) => None,
            LimitValue::Approx(v) => Some(*v),
        }
    }

    fn same(&self, other: &LimitValue) -> bool {
        match (self, other) {
            (LimitValue::Infinite(a), LimitValue::Infinite(b)) => a == b,
            (LimitValue::Infinite(_), _) | (_, LimitValue::Infinite(_)) => false,
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => (a - b).abs() <= RECOGNIZE_TOLERANCE * a.abs().max(1.0),
                _ => self == other,
            },
        }
    }
}

impl Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Exact(expr) => write!(f, "{}", expr),
            LimitValue::Infinite(Sign::Pos) => write!(f, "oo"),
            LimitValue::Infinite(Sign::Neg) => write!(f, "-oo"),
            LimitValue::Approx(v) => write!(f, "{}", crate::format_float(*v, 10)),
        }
    }
}

/// The limit of `expr` as `var` approaches `point` from `direction`. At an
/// infinite point the direction is implied.
pub fn limit(
    expr: &Expr,
    var: &Identifier,
    point: &LimitPoint,
    direction: Direction,
) -> Result<LimitValue> {
    #[cfg(feature = "tracy")]
    profiling::scope!("limit");
    let f = expr.simplify();
    if f.is_poisoned() {
        return Err(Error::Undefined);
    }
    let value = Limit {
        var,
        point,
        direction,
    }
    .of(&f, 0)?;
    log::debug!("lim {} as {} -> {}{} = {}", f, var, point, direction.as_str(), value);
    Ok(value)
}

struct Limit<'a> {
    var: &'a Identifier,
    point: &'a LimitPoint,
    direction: Direction,
}

impl Limit<'_> {
    fn of(&self, f: &Expr, depth: usize) -> Result<LimitValue> {
        cancel::check()?;
        if !f.contains(self.var) {
            return Ok(LimitValue::Exact(f.clone()));
        }
        if let Some(value) = self.substitution(f) {
            return Ok(value);
        }
        if let LimitPoint::Infinity(sign) = self.point {
            if let Some(value) = Poly::from_expr(f, self.var).and_then(|p| polynomial_at_infinity(&p, *sign)) {
                return Ok(value);
            }
        }
        if depth < MAX_LHOPITAL {
            if let Some(value) = self.quotient(f, depth) {
                return Ok(value);
            }
        }
        self.probe(f)
    }

    fn substitution(&self, f: &Expr) -> Option<LimitValue> {
        let value = f.substitute(self.var, &self.point.to_expr()).simplify();
        if value.is_poisoned() {
            return None;
        }
        if let Some(sign) = value.as_infinity() {
            return Some(LimitValue::Infinite(sign));
        }
        if value.any(&|f| matches!(f, Factor::Const(Constant::Infinity))) {
            return None;
        }
        Some(LimitValue::Exact(value))
    }

    /// Splits `f` into numerator and denominator and combines their limits.
    fn quotient(&self, f: &Expr, depth: usize) -> Option<LimitValue> {
        let (numerator, denominators) = clear_denominators(f, self.var);
        if denominators.is_empty() {
            return None;
        }
        let denominator = Expr::from(
            denominators
                .into_iter()
                .map(|(base, k)| Factor::Pow(base, Expr::from(k)))
                .collect::<Vec<_>>(),
        )
        .simplify();

        if let LimitPoint::Infinity(sign) = self.point {
            if let (Some(n), Some(d)) = (
                Poly::from_expr(&numerator, self.var),
                Poly::from_expr(&denominator, self.var),
            ) {
                if let Some(value) = degree_ratio(&n, &d, *sign) {
                    return Some(value);
                }
            }
        }

        let n = self.of(&numerator, depth + 1).ok()?;
        let d = self.of(&denominator, depth + 1).ok()?;
        if (n.is_zero() && d.is_zero()) || (n.is_infinite() && d.is_infinite()) {
            let dn = numerator.derivative(self.var).ok()?;
            let dd = denominator.derivative(self.var).ok()?;
            log::trace!("l'hopital: ({}) / ({})", dn, dd);
            return self.of(&(dn * dd.recip()).simplify(), depth + 1).ok();
        }
        match (n, d) {
            (LimitValue::Exact(a), LimitValue::Exact(b)) if !b.is_zero() => {
                Some(LimitValue::Exact((a * b.recip()).simplify()))
            }
            (LimitValue::Exact(_) | LimitValue::Approx(_), LimitValue::Infinite(_)) => {
                Some(LimitValue::Exact(Expr::zero()))
            }
            (LimitValue::Infinite(s), d) => {
                let v = d.numeric().filter(|v| *v != 0.0)?;
                Some(LimitValue::Infinite(s * Sign::of(v)))
            }
            _ => None,
        }
    }

    fn probe(&self, f: &Expr) -> Result<LimitValue> {
        let sides: &[Sign] = match (self.point, self.direction) {
            (LimitPoint::Infinity(Sign::Pos), _) => &[Sign::Pos],
            (LimitPoint::Infinity(Sign::Neg), _) => &[Sign::Neg],
            (_, Direction::Both) => &[Sign::Neg, Sign::Pos],
            (_, Direction::Plus) => &[Sign::Pos],
            (_, Direction::Minus) => &[Sign::Neg],
        };
        let mut found: Option<LimitValue> = None;
        for side in sides {
            cancel::check()?;
            let samples = self.samples(f, *side);
            log::trace!("probing {} from {:?}: {:?}", f, side, samples);
            let value = trend(&samples).ok_or(Error::LimitUndetermined)?;
            match &found {
                Some(previous) if !previous.same(&value) => return Err(Error::LimitDoesNotExist),
                Some(_) => {}
                None => found = Some(value),
            }
        }
        found.ok_or(Error::LimitUndetermined)
    }

    fn samples(&self, f: &Expr, side: Sign) -> Vec<f64> {
        let center = match self.point {
            LimitPoint::Finite(p) => match p.evaluate(&Bindings::new()) {
                Ok(z) if z.im == 0.0 => Some(z.re),
                _ => return Vec::new(),
            },
            LimitPoint::Infinity(_) => None,
        };
        let side = match side {
            Sign::Pos => 1.0,
            Sign::Neg => -1.0,
        };
        PROBE_EXPONENTS
            .filter_map(|k| {
                let x = match center {
                    Some(c) => c + side * 10f64.powi(-k),
                    None => side * 10f64.powi(k),
                };
                let bindings = Bindings::from([(self.var.clone(), x.into())]);
                let z = f.evaluate(&bindings).ok()?;
                (z.re.is_finite() && z.im.abs() <= 1e-9 * z.re.abs().max(1.0)).then_some(z.re)
            })
            .collect()
    }
}

fn polynomial_at_infinity(poly: &Poly, sign: Sign) -> Option<LimitValue> {
    if poly.degree() == 0 {
        return Some(LimitValue::Exact(poly.coeff(0)));
    }
    let lead = poly.leading().evaluate(&Bindings::new()).ok()?;
    if lead.im != 0.0 || lead.re == 0.0 {
        return None;
    }
    Some(LimitValue::Infinite(
        Sign::of(lead.re) * sign.pow(poly.degree() as u64),
    ))
}

/// Limit at infinity of a quotient of polynomials.
fn degree_ratio(numerator: &Poly, denominator: &Poly, sign: Sign) -> Option<LimitValue> {
    if denominator.is_zero() {
        return None;
    }
    let (n, d) = (numerator.degree(), denominator.degree());
    if numerator.is_zero() || n < d {
        return Some(LimitValue::Exact(Expr::zero()));
    }
    let ratio = (numerator.leading() * denominator.leading().recip()).simplify();
    if n == d {
        return Some(LimitValue::Exact(ratio));
    }
    let lead = ratio.evaluate(&Bindings::new()).ok()?;
    if lead.im != 0.0 || lead.re == 0.0 {
        return None;
    }
    Some(LimitValue::Infinite(
        Sign::of(lead.re) * sign.pow((n - d) as u64),
    ))
}

/// Reads the behavior of the last probes: convergence, decay to zero, or
/// divergence.
fn trend(samples: &[f64]) -> Option<LimitValue> {
    let [.., a, b, c] = samples else {
        return None;
    };
    let (a, b, c) = (*a, *b, *c);
    if (c - b).abs() <= RECOGNIZE_TOLERANCE * c.abs().max(1.0)
        && (b - a).abs() <= 1e-3 * b.abs().max(1.0)
    {
        return Some(recognize(c));
    }
    if c.abs() < 1e-5 && c.abs() <= b.abs() && b.abs() <= a.abs() {
        return Some(LimitValue::Exact(Expr::zero()));
    }
    let same_sign = a.signum() == b.signum() && b.signum() == c.signum();
    if same_sign && a.abs() < b.abs() && b.abs() < c.abs() && (c - b).abs() >= 0.5 * (b - a).abs() {
        return Some(LimitValue::Infinite(Sign::of(c)));
    }
    None
}

/// Closed form of a probed value: a small rational, or a rational multiple of
/// `pi` or `E`.
fn recognize(v: f64) -> LimitValue {
    if v.abs() < 1e-9 {
        return LimitValue::Exact(Expr::zero());
    }
    let close = |x: f64, max_denom: i64| {
        Fraction::from_f64(x, max_denom, RECOGNIZE_TOLERANCE * x.abs().max(1.0))
    };
    if let Some(q) = close(v, 100) {
        return LimitValue::Exact(Expr::from(q));
    }
    for (value, constant) in [(PI, Constant::Pi), (E, Constant::E)] {
        if let Some(q) = close(v / value, 12) {
            return LimitValue::Exact((Expr::from(q) * Expr::constant(constant)).simplify());
        }
    }
    LimitValue::Approx(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lim(s: &str, point: &str, direction: Direction) -> Result<LimitValue> {
        let _ = env_logger::builder().is_test(true).try_init();
        limit(
            &s.parse().unwrap(),
            &Identifier::from('x'),
            &LimitPoint::from_expr(&point.parse().unwrap()),
            direction,
        )
    }

    fn shown(s: &str, point: &str) -> String {
        lim(s, point, Direction::Both).unwrap().to_string()
    }

    #[test]
    fn continuous_points() {
        assert_eq!(shown("x**2 + 1", "2"), "5");
        assert_eq!(shown("sin(x)", "pi/2"), "1");
        assert_eq!(shown("y*x", "3"), "3*y");
    }

    #[test]
    fn removable_singularities() {
        assert_eq!(shown("sin(x)/x", "0"), "1");
        assert_eq!(shown("(x**2 - 1)/(x - 1)", "1"), "2");
        assert_eq!(shown("(1 - cos(x))/x**2", "0"), "1/2");
    }

    #[test]
    fn limits_at_infinity() {
        assert_eq!(shown("(x**2 + 1)/(2*x**2)", "oo"), "1/2");
        assert_eq!(shown("1/x", "oo"), "0");
        assert_eq!(shown("x**3/(x + 1)", "-oo"), "oo");
        assert_eq!(shown("x**2 - x", "oo"), "oo");
        assert_eq!(shown("(1 + 1/x)**x", "oo"), "E");
    }

    #[test]
    fn one_sided_limits() {
        assert_eq!(lim("1/x", "0", Direction::Plus).unwrap(), LimitValue::Infinite(Sign::Pos));
        assert_eq!(lim("1/x", "0", Direction::Minus).unwrap(), LimitValue::Infinite(Sign::Neg));
        assert!(matches!(lim("1/x", "0", Direction::Both), Err(Error::LimitDoesNotExist)));
        assert_eq!(shown("1/x**2", "0"), "oo");
        assert_eq!(lim("log(x)", "0", Direction::Plus).unwrap(), LimitValue::Infinite(Sign::Neg));
    }

    #[test]
    fn probed_values_are_recognized() {
        assert_eq!(recognize(0.5).to_string(), "1/2");
        assert_eq!(recognize(std::f64::consts::FRAC_PI_2 + 1e-9).to_string(), "pi/2");
        assert_eq!(recognize(E).to_string(), "E");
        assert!(matches!(recognize(std::f64::consts::SQRT_2), LimitValue::Approx(_)));
    }
}
