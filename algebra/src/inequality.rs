//! Univariate inequalities over the reals.

use std::fmt::{self, Display};

use crate::{
    cancel, format_float,
    solve::{clear_denominators, solve, Solution, SolutionSet},
    Bindings, Error, Expr, Expression, Identifier, Result,
};

/// Values this close to zero count as zero at critical points.
const ZERO: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    NotEqual,
}

impl Relation {
    pub fn from_str(s: &str) -> Option<Relation> {
        match s {
            "<" => Some(Relation::Less),
            "<=" => Some(Relation::LessOrEqual),
            ">" => Some(Relation::Greater),
            ">=" => Some(Relation::GreaterOrEqual),
            "!=" => Some(Relation::NotEqual),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Relation::Less => "<",
            Relation::LessOrEqual => "<=",
            Relation::Greater => ">",
            Relation::GreaterOrEqual => ">=",
            Relation::NotEqual => "!=",
        }
    }

    /// Whether `value <relation> 0`.
    pub fn holds(&self, value: f64) -> bool {
        match self {
            Relation::Less => value < 0.0,
            Relation::LessOrEqual => value <= 0.0,
            Relation::Greater => value > 0.0,
            Relation::GreaterOrEqual => value >= 0.0,
            Relation::NotEqual => value != 0.0,
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub value: f64,
    /// Exact form when known.
    pub expr: Option<Expr>,
}

impl Endpoint {
    fn infinite(negative: bool) -> Endpoint {
        Endpoint {
            value: if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            },
            expr: None,
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            Some(expr) => write!(f, "{}", expr),
            None => write!(f, "{}", format_float(self.value, 10)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interval {
    pub start: Endpoint,
    pub start_closed: bool,
    pub end: Endpoint,
    pub end_closed: bool,
}

impl Interval {
    pub fn is_point(&self) -> bool {
        self.start_closed && self.end_closed && self.start.value == self.end.value
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_point() {
            return write!(f, "{{{}}}", self.start);
        }
        write!(
            f,
            "{}{}, {}{}",
            if self.start_closed { '[' } else { '(' },
            self.start,
            self.end,
            if self.end_closed { ']' } else { ')' }
        )
    }
}

/// A union of disjoint intervals in increasing order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RealSet {
    pub intervals: Vec<Interval>,
}

impl RealSet {
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_everything(&self) -> bool {
        matches!(self.intervals.as_slice(), [i] if i.start.value == f64::NEG_INFINITY && i.end.value == f64::INFINITY)
    }
}

impl Display for RealSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "∅");
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, " ∪ ")?;
            }
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}

struct Critical {
    point: Endpoint,
    pole: bool,
}

enum Piece {
    Open(Endpoint, Endpoint),
    Point(Endpoint),
}

/// Real values of `var` where `lhs <relation> rhs`, found by sign analysis
/// between the real zeros and poles of `lhs - rhs`.
pub fn solve_inequality(
    lhs: &Expr,
    relation: Relation,
    rhs: &Expr,
    var: &Identifier,
) -> Result<RealSet> {
    #[cfg(feature = "tracy")]
    profiling::scope!("solve_inequality");
    let f = (lhs.clone() - rhs.clone()).simplify();
    if f.is_poisoned() {
        return Err(Error::Undefined);
    }
    if f.identifiers().iter().any(|id| id != var) {
        return Err(Error::Unsupported(String::from(
            "inequalities with more than one symbol",
        )));
    }

    let (numerator, denominators) = clear_denominators(&f, var);
    let mut critical = Vec::new();
    if let SolutionSet::Finite(zeros) = solve(&numerator, var)? {
        critical.extend(real_points(zeros, false));
    }
    for (den, _) in &denominators {
        if let SolutionSet::Finite(poles) = solve(den, var)? {
            critical.extend(real_points(poles, true));
        }
    }
    critical.sort_by(|a, b| a.point.value.total_cmp(&b.point.value));
    critical.dedup_by(|later, kept| {
        let same = (later.point.value - kept.point.value).abs() <= ZERO;
        if same {
            kept.pole |= later.pole;
        }
        same
    });
    log::debug!(
        "critical points of {} {} 0: {:?}",
        f,
        relation,
        critical.iter().map(|c| c.point.value).collect::<Vec<_>>()
    );

    let value_at = |x: f64| -> Option<f64> {
        let bindings = Bindings::from([(var.clone(), x.into())]);
        let z = f.evaluate(&bindings).ok()?;
        (z.is_finite() && z.im.abs() <= 1e-9 * z.re.abs().max(1.0)).then_some(z.re)
    };

    let mut pieces: Vec<(Piece, bool)> = Vec::new();
    let mut lower = Endpoint::infinite(true);
    for (i, c) in critical.iter().enumerate() {
        cancel::check()?;
        let sample = if i == 0 {
            c.point.value - c.point.value.abs().max(1.0)
        } else {
            (lower.value + c.point.value) / 2.0
        };
        let included = value_at(sample).map_or(false, |v| relation.holds(v));
        pieces.push((Piece::Open(lower, c.point.clone()), included));

        let at_point = if c.pole {
            false
        } else {
            value_at(c.point.value)
                .map(|v| if v.abs() <= ZERO { 0.0 } else { v })
                .map_or(false, |v| relation.holds(v))
        };
        pieces.push((Piece::Point(c.point.clone()), at_point));
        lower = c.point.clone();
    }
    let sample = if lower.value.is_infinite() {
        0.0
    } else {
        lower.value + lower.value.abs().max(1.0)
    };
    let included = value_at(sample).map_or(false, |v| relation.holds(v));
    pieces.push((Piece::Open(lower, Endpoint::infinite(false)), included));

    Ok(merge(pieces))
}

fn real_points(solutions: Vec<Solution>, pole: bool) -> Vec<Critical> {
    solutions
        .into_iter()
        .filter_map(|s| {
            let value = s.real()?;
            let expr = match s {
                Solution::Exact(e) => Some(e),
                Solution::Approx(_) => None,
            };
            Some(Critical {
                point: Endpoint { value, expr },
                pole,
            })
        })
        .collect()
}

fn merge(pieces: Vec<(Piece, bool)>) -> RealSet {
    let mut intervals = Vec::new();
    let mut current: Option<(Endpoint, bool)> = None;
    let mut last: Option<(Endpoint, bool)> = None;
    for (piece, included) in pieces {
        if !included {
            if let (Some((start, start_closed)), Some((end, end_closed))) = (current.take(), last.take()) {
                intervals.push(Interval {
                    start,
                    start_closed,
                    end,
                    end_closed,
                });
            }
            continue;
        }
        let (start, end) = match piece {
            Piece::Open(lo, hi) => ((lo, false), (hi, false)),
            Piece::Point(p) => ((p.clone(), true), (p, true)),
        };
        if current.is_none() {
            current = Some(start);
        }
        last = Some(end);
    }
    if let (Some((start, start_closed)), Some((end, end_closed))) = (current, last) {
        intervals.push(Interval {
            start,
            start_closed,
            end,
            end_closed,
        });
    }
    RealSet { intervals }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solved(lhs: &str, relation: &str, rhs: &str) -> String {
        solve_inequality(
            &lhs.parse().unwrap(),
            Relation::from_str(relation).unwrap(),
            &rhs.parse().unwrap(),
            &Identifier::from('x'),
        )
        .unwrap()
        .to_string()
    }

    #[test]
    fn polynomial_inequalities() {
        assert_eq!(solved("x**2 - 4", ">", "0"), "(-oo, -2) ∪ (2, oo)");
        assert_eq!(solved("2*x", "<=", "5"), "(-oo, 5/2]");
        assert_eq!(solved("x**2", "<", "0"), "∅");
        assert_eq!(solved("x**2", ">=", "0"), "(-oo, oo)");
        assert_eq!(solved("x**2", "<=", "0"), "{0}");
        assert_eq!(solved("x", "!=", "3"), "(-oo, 3) ∪ (3, oo)");
    }

    #[test]
    fn rational_inequalities() {
        assert_eq!(solved("(x - 1)/(x + 2)", ">=", "0"), "(-oo, -2) ∪ [1, oo)");
        assert_eq!(solved("1/x", ">", "0"), "(0, oo)");
    }

    #[test]
    fn constant_inequalities() {
        assert_eq!(solved("1", "<", "2"), "(-oo, oo)");
        assert_eq!(solved("3", "<", "2"), "∅");
        assert!(matches!(
            solve_inequality(
                &"x + y".parse().unwrap(),
                Relation::Less,
                &Expr::zero(),
                &Identifier::from('x')
            ),
            Err(Error::Unsupported(_))
        ));
    }
}
