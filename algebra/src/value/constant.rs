use std::fmt::Display;

use num::complex::Complex64;

/// Named numbers the engine keeps symbolic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    Pi,
    E,
    I,
    Infinity,
    ComplexInfinity,
    NaN,
}

impl Constant {
    pub fn from_str(string: &str) -> Option<Self> {
        match string {
            "pi" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            "I" => Some(Constant::I),
            "oo" => Some(Constant::Infinity),
            "zoo" => Some(Constant::ComplexInfinity),
            "nan" => Some(Constant::NaN),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
            Constant::I => "I",
            Constant::Infinity => "oo",
            Constant::ComplexInfinity => "zoo",
            Constant::NaN => "nan",
        }
    }

    pub fn value(&self) -> Complex64 {
        match self {
            Constant::Pi => Complex64::new(std::f64::consts::PI, 0.0),
            Constant::E => Complex64::new(std::f64::consts::E, 0.0),
            Constant::I => Complex64::i(),
            Constant::Infinity => Complex64::new(f64::INFINITY, 0.0),
            Constant::ComplexInfinity => Complex64::new(f64::INFINITY, f64::INFINITY),
            Constant::NaN => Complex64::new(f64::NAN, f64::NAN),
        }
    }

    /// Values that absorb or poison arithmetic instead of combining with it.
    pub const fn is_exceptional(&self) -> bool {
        matches!(
            self,
            Constant::Infinity | Constant::ComplexInfinity | Constant::NaN
        )
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
