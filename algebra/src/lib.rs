//! Symbolic algebra over exact rationals: parsing, simplification,
//! derivatives, antiderivatives, equation and inequality solving, limits and
//! finite series.

pub mod cancel;
mod error;
mod identifier;
pub mod inequality;
pub mod integrate;
pub mod limit;
pub mod parser;
pub mod poly;
pub mod series;
pub mod solve;
mod value;

pub use error::{Error, Result};
pub use identifier::Identifier;
pub use value::{
    make_power, Bindings, Constant, Expr, Expression, Factor, Fraction, Func, Sign, Signed,
    Term, ToTerm, FACTORIAL_LIMIT,
};

/// Numeric value of a constant expression.
pub fn evaluate(expr: &Expr) -> Result<num::complex::Complex64> {
    expr.evaluate(&Bindings::new())
}

/// Decimal rendering of a float with at most `digits` significant digits and
/// no trailing zeros.
pub fn format_float(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return String::from("nan");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "oo" } else { "-oo" });
    }
    if value == 0.0 {
        return String::from("0");
    }
    let magnitude = value.abs().log10().floor() as i32;
    if !(-5..16).contains(&magnitude) {
        let s = format!("{:.*e}", digits.saturating_sub(1), value);
        return match s.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_zeros(mantissa), exp),
            None => s,
        };
    }
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, value)).to_owned()
}

/// `a`, `b*I` or `a + b*I` with floats formatted by [`format_float`].
pub fn format_complex(z: num::complex::Complex64) -> String {
    const DIGITS: usize = 10;
    if z.im == 0.0 {
        format_float(z.re, DIGITS)
    } else if z.re == 0.0 {
        format!("{}*I", format_float(z.im, DIGITS))
    } else {
        let sign = if z.im < 0.0 { '-' } else { '+' };
        format!(
            "{} {} {}*I",
            format_float(z.re, DIGITS),
            sign,
            format_float(z.im.abs(), DIGITS)
        )
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_are_trimmed() {
        assert_eq!(format_float(6.283185307179586, 10), "6.283185307");
        assert_eq!(format_float(0.5, 10), "0.5");
        assert_eq!(format_float(4.0, 10), "4");
        assert_eq!(format_float(-1.25e20, 4), "-1.25e20");
        assert_eq!(format_float(f64::INFINITY, 10), "oo");
    }

    #[test]
    fn evaluate_constants() {
        let value = evaluate(&"2*pi".parse::<Expr>().unwrap()).unwrap();
        assert!((value.re - std::f64::consts::TAU).abs() < 1e-12);
        assert!(matches!(
            evaluate(&"x + 1".parse::<Expr>().unwrap()),
            Err(Error::FreeSymbol(_))
        ));
    }
}
