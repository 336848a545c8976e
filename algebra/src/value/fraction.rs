use std::{
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num::{BigInt, BigRational, One, Signed as _, ToPrimitive, Zero};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Pos,
    Neg,
}

impl Sign {
    pub fn pow(self, n: u64) -> Sign {
        match self {
            Sign::Pos => Sign::Pos,
            Sign::Neg => {
                if n % 2 == 0 {
                    Sign::Pos
                } else {
                    Sign::Neg
                }
            }
        }
    }

    pub fn of(value: f64) -> Sign {
        if value.is_sign_negative() {
            Sign::Neg
        } else {
            Sign::Pos
        }
    }
}

impl Neg for Sign {
    type Output = Sign;

    fn neg(self) -> Sign {
        match self {
            Sign::Pos => Sign::Neg,
            Sign::Neg => Sign::Pos,
        }
    }
}

impl Mul<Sign> for Sign {
    type Output = Sign;

    fn mul(self, rhs: Sign) -> Self::Output {
        if self == rhs {
            Sign::Pos
        } else {
            Sign::Neg
        }
    }
}

pub trait Signed {
    fn sign(&self) -> Sign;
    fn mul_sign(self, sign: Sign) -> Self;
}

impl Signed for f64 {
    fn sign(&self) -> Sign {
        Sign::of(*self)
    }

    fn mul_sign(self, sign: Sign) -> Self {
        match sign {
            Sign::Pos => self,
            Sign::Neg => -self,
        }
    }
}

/// Exact rational number backed by arbitrary precision integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fraction(BigRational);

impl Default for Fraction {
    fn default() -> Self {
        Fraction::zero()
    }
}

/// Largest power magnitude (in result bits) computed exactly.
const MAX_POW_BITS: u64 = 200_000;
/// Trial divisors used when pulling perfect powers out of a radicand.
const ROOT_TRIAL_LIMIT: u32 = 2_000;

impl Fraction {
    pub fn new(n: i64, d: i64) -> Self {
        Fraction(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    pub fn from_integer(n: impl Into<BigInt>) -> Self {
        Fraction(BigRational::from_integer(n.into()))
    }

    pub fn from_ratio(n: BigInt, d: BigInt) -> Option<Self> {
        if d.is_zero() {
            None
        } else {
            Some(Fraction(BigRational::new(n, d)))
        }
    }

    pub fn zero() -> Self {
        Fraction(BigRational::zero())
    }

    pub fn one() -> Self {
        Fraction(BigRational::one())
    }

    pub fn neg_one() -> Self {
        Fraction::from_integer(-1)
    }

    pub fn whole(n: i64) -> Self {
        Fraction::from_integer(n)
    }

    /// Parses the digits of a decimal literal, `int.frac`, exactly.
    pub fn from_decimal(int: &str, frac: &str) -> Option<Self> {
        let int = if int.is_empty() { "0" } else { int };
        let digits = format!("{int}{frac}");
        let n = BigInt::parse_bytes(digits.as_bytes(), 10)?;
        let d = BigInt::from(10u32).pow(frac.len() as u32);
        Fraction::from_ratio(n, d)
    }

    /// Best rational approximation of `x` with a denominator up to `max_denom`,
    /// accepted only when it reproduces `x` within `tolerance`.
    pub fn from_f64(x: f64, max_denom: i64, tolerance: f64) -> Option<Self> {
        if !x.is_finite() || x.abs() > 1e15 {
            return None;
        }
        let sign = x.sign();
        let start_x = x.abs();
        let mut x = start_x;
        let mut m = [[1i64, 0i64], [0i64, 1i64]];
        let mut ai = x as i64;
        while m[1][0] * ai + m[1][1] <= max_denom {
            let r = m[0][1];
            m[0][1] = m[0][0];
            m[0][0] = m[0][0] * ai + r;

            let r = m[1][1];
            m[1][1] = m[1][0];
            m[1][0] = m[1][0] * ai + r;

            if x == ai as f64 {
                break;
            }
            x = 1.0 / (x - ai as f64);
            if x > 1e15 {
                break;
            }
            ai = x as i64;
        }
        if m[1][0] == 0 {
            return None;
        }
        let t = Fraction::new(m[0][0], m[1][0]);
        if (t.to_f64() - start_x).abs() <= tolerance {
            Some(t.mul_sign(sign))
        } else {
            None
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn is_neg(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_pos(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    pub fn n(&self) -> &BigInt {
        self.0.numer()
    }

    pub fn d(&self) -> &BigInt {
        self.0.denom()
    }

    pub fn abs(&self) -> Self {
        Fraction(self.0.abs())
    }

    pub fn sign(&self) -> Sign {
        if self.is_neg() {
            Sign::Neg
        } else {
            Sign::Pos
        }
    }

    pub fn mul_sign(self, sign: Sign) -> Self {
        match sign {
            Sign::Pos => self,
            Sign::Neg => -self,
        }
    }

    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(Fraction(self.0.recip()))
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.to_integer().to_i64()
        } else {
            None
        }
    }

    pub fn to_integer(&self) -> Option<BigInt> {
        if self.is_integer() {
            Some(self.0.to_integer())
        } else {
            None
        }
    }

    /// Bit length of the larger of numerator and denominator.
    pub fn bits(&self) -> u64 {
        self.n().bits().max(self.d().bits())
    }

    /// `self ^ exp` for an integer exponent. `None` for `0 ^ -n` or when the
    /// result would be unreasonably large.
    pub fn pow(&self, exp: i64) -> Option<Self> {
        #[cfg(feature = "tracy")]
        profiling::scope!("Fraction::pow");
        if exp == 0 {
            return Some(Fraction::one());
        }
        if self.is_zero() {
            return if exp > 0 { Some(Fraction::zero()) } else { None };
        }
        if self.abs().is_one() {
            return Some(Fraction::one().mul_sign(self.sign().pow(exp.unsigned_abs())));
        }
        if self.bits().saturating_mul(exp.unsigned_abs()) > MAX_POW_BITS {
            return None;
        }
        let e = u32::try_from(exp.unsigned_abs()).ok()?;
        let n = self.n().pow(e);
        let d = self.d().pow(e);
        if exp > 0 {
            Fraction::from_ratio(n, d)
        } else {
            Fraction::from_ratio(d, n)
        }
    }

    /// Splits the positive number `self` as `outside * inside^(1/q)` with an
    /// integer `inside` free of `q`-th powers among small divisors.
    pub fn extract_root(&self, q: u32) -> Option<(Fraction, BigInt)> {
        if !self.is_pos() || q < 2 || self.bits() > 512 {
            return None;
        }
        // (n / d)^(1/q) = (n * d^(q-1))^(1/q) / d
        let radicand = self.n() * self.d().pow(q - 1);
        let mut inside = radicand;
        let mut outside = BigInt::one();

        let exact = inside.nth_root(q);
        if exact.pow(q) == inside {
            return Some((
                Fraction::from_ratio(exact, self.d().clone())?,
                BigInt::one(),
            ));
        }

        for p in 2..=ROOT_TRIAL_LIMIT {
            let pq = BigInt::from(p).pow(q);
            if pq > inside {
                break;
            }
            while (&inside % &pq).is_zero() {
                inside /= &pq;
                outside *= p;
            }
        }
        let rest = inside.nth_root(q);
        if rest.pow(q) == inside {
            outside *= rest;
            inside = BigInt::one();
        }
        Some((Fraction::from_ratio(outside, self.d().clone())?, inside))
    }

    /// Exact factorial of a non-negative integer.
    pub fn factorial(&self, limit: u64) -> Option<Self> {
        let n = self.to_i64()?;
        if n < 0 || n as u64 > limit {
            return None;
        }
        let product = (2..=n).fold(BigInt::one(), |acc, k| acc * k);
        Some(Fraction::from_integer(product))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.n())
        } else {
            write!(f, "{}/{}", self.n(), self.d())
        }
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::whole(n)
    }
}

impl From<BigInt> for Fraction {
    fn from(n: BigInt) -> Self {
        Fraction::from_integer(n)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Self::Output {
        Fraction(-self.0)
    }
}

impl Add for Fraction {
    type Output = Fraction;

    fn add(self, rhs: Self) -> Self::Output {
        Fraction(self.0 + rhs.0)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Self) -> Self::Output {
        Fraction(self.0 - rhs.0)
    }
}

impl Mul for Fraction {
    type Output = Fraction;

    fn mul(self, rhs: Self) -> Self::Output {
        Fraction(self.0 * rhs.0)
    }
}

/// Panics on a zero divisor, like integer division.
impl Div for Fraction {
    type Output = Fraction;

    fn div(self, rhs: Self) -> Self::Output {
        Fraction(self.0 / rhs.0)
    }
}

impl AddAssign for Fraction {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Fraction {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for Fraction {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl DivAssign for Fraction {
    fn div_assign(&mut self, rhs: Self) {
        self.0 /= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_literals_are_exact() {
        assert_eq!(Fraction::from_decimal("2", "5"), Some(Fraction::new(5, 2)));
        assert_eq!(Fraction::from_decimal("", "125"), Some(Fraction::new(1, 8)));
        assert_eq!(Fraction::from_decimal("10", ""), Some(Fraction::whole(10)));
    }

    #[test]
    fn integer_powers() {
        let half = Fraction::new(1, 2);
        assert_eq!(half.pow(3), Some(Fraction::new(1, 8)));
        assert_eq!(half.pow(-2), Some(Fraction::whole(4)));
        assert_eq!(Fraction::zero().pow(-1), None);
        assert_eq!(Fraction::neg_one().pow(3), Some(Fraction::neg_one()));
        assert_eq!(Fraction::neg_one().pow(4), Some(Fraction::one()));
    }

    #[test]
    fn roots_are_split() {
        let (outside, inside) = Fraction::whole(8).extract_root(2).unwrap();
        assert_eq!(outside, Fraction::whole(2));
        assert_eq!(inside, BigInt::from(2));

        let (outside, inside) = Fraction::whole(16).extract_root(2).unwrap();
        assert_eq!(outside, Fraction::whole(4));
        assert_eq!(inside, BigInt::one());

        let (outside, inside) = Fraction::new(1, 2).extract_root(2).unwrap();
        assert_eq!(outside, Fraction::new(1, 2));
        assert_eq!(inside, BigInt::from(2));
    }

    #[test]
    fn continued_fraction_recovers_small_rationals() {
        assert_eq!(
            Fraction::from_f64(0.3333333333, 1000, 1e-8),
            Some(Fraction::new(1, 3))
        );
        assert_eq!(Fraction::from_f64(-2.5, 1000, 1e-12), Some(Fraction::new(-5, 2)));
        assert_eq!(Fraction::from_f64(std::f64::consts::PI, 100, 1e-9), None);
    }

    #[test]
    fn factorial_is_exact() {
        assert_eq!(
            Fraction::whole(20).factorial(100),
            Some(Fraction::from_integer(2_432_902_008_176_640_000i64))
        );
        assert_eq!(Fraction::whole(-1).factorial(100), None);
        assert_eq!(Fraction::new(1, 2).factorial(100), None);
    }
}
