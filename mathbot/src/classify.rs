//! Keyword driven classification of normalized text.

use std::fmt::Display;

use algebra::{inequality::Relation, limit::Direction, Identifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Arithmetic,
    Equation,
    Inequality,
    Derivative,
    Integral,
    Limit,
    SeriesSum,
    SeriesProduct,
    Factorial,
}

impl ExpressionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExpressionKind::Arithmetic => "arithmetic",
            ExpressionKind::Equation => "equation",
            ExpressionKind::Inequality => "inequality",
            ExpressionKind::Derivative => "derivative",
            ExpressionKind::Integral => "integral",
            ExpressionKind::Limit => "limit",
            ExpressionKind::SeriesSum => "sum",
            ExpressionKind::SeriesProduct => "product",
            ExpressionKind::Factorial => "factorial",
        }
    }

    /// Title shown to the user in front of a result.
    pub const fn label(&self) -> &'static str {
        match self {
            ExpressionKind::Arithmetic => "Результат",
            ExpressionKind::Equation => "Решение уравнения",
            ExpressionKind::Inequality => "Решение неравенства",
            ExpressionKind::Derivative => "Производная",
            ExpressionKind::Integral => "Интеграл",
            ExpressionKind::Limit => "Предел",
            ExpressionKind::SeriesSum => "Сумма",
            ExpressionKind::SeriesProduct => "Произведение",
            ExpressionKind::Factorial => "Факториал",
        }
    }
}

impl Display for ExpressionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body, index and bounds of a sum or product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub expr: String,
    pub var: Option<String>,
    pub bounds: Option<(String, String)>,
}

/// A kind together with the operand texts extracted for it.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Arithmetic {
        expr: String,
    },
    Equation {
        lhs: String,
        rhs: String,
        var: Option<String>,
    },
    Inequality {
        lhs: String,
        relation: Relation,
        rhs: String,
    },
    Derivative {
        expr: String,
        var: Option<String>,
    },
    Integral {
        expr: String,
        var: Option<String>,
        bounds: Option<(String, String)>,
    },
    Limit {
        expr: String,
        var: String,
        point: String,
        direction: Direction,
    },
    SeriesSum(Series),
    SeriesProduct(Series),
    /// `expr` is a complete expression in which factorials are applied.
    Factorial {
        expr: String,
    },
}

impl Classification {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Classification::Arithmetic { .. } => ExpressionKind::Arithmetic,
            Classification::Equation { .. } => ExpressionKind::Equation,
            Classification::Inequality { .. } => ExpressionKind::Inequality,
            Classification::Derivative { .. } => ExpressionKind::Derivative,
            Classification::Integral { .. } => ExpressionKind::Integral,
            Classification::Limit { .. } => ExpressionKind::Limit,
            Classification::SeriesSum(_) => ExpressionKind::SeriesSum,
            Classification::SeriesProduct(_) => ExpressionKind::SeriesProduct,
            Classification::Factorial { .. } => ExpressionKind::Factorial,
        }
    }
}

const SOLVE: &str = "solve";
const INTEGRATE: &str = "integrate";
const DIFF: &str = "diff";
const LIMIT: &str = "limit";
const SUM: &str = "Sum";
const PRODUCT: &str = "Product";
const FACTORIAL: &str = "factorial";
const ARROW: &str = "->";

/// Assigns exactly one kind to `text`. The first matching rule wins.
pub fn classify(text: &str) -> Classification {
    let text = text.trim();
    let classification = equation(text)
        .or_else(|| integral(text))
        .or_else(|| derivative(text))
        .or_else(|| limit(text))
        .or_else(|| series(text))
        .or_else(|| factorial(text))
        .or_else(|| inequality(text))
        .unwrap_or_else(|| Classification::Arithmetic {
            expr: text.to_owned(),
        });
    log::debug!("classified {:?} as {}", text, classification.kind());
    classification
}

fn equation(text: &str) -> Option<Classification> {
    let stripped = strip_solve(text);
    let (body, var) = match split_top_level(stripped).as_slice() {
        [body, var] if Identifier::is_valid_name(var) => (*body, Some((*var).to_owned())),
        _ => (stripped, None),
    };
    if let Some((lhs, rhs)) = split_equality(body) {
        return Some(Classification::Equation {
            lhs: lhs.trim().to_owned(),
            rhs: rhs.trim().to_owned(),
            var,
        });
    }
    // `solve f` means `f = 0`
    if stripped.len() < text.len() && !stripped.is_empty() && comparison(body).is_none() {
        return Some(Classification::Equation {
            lhs: body.trim().to_owned(),
            rhs: String::from("0"),
            var,
        });
    }
    None
}

fn integral(text: &str) -> Option<Classification> {
    let args = keyword_arguments(text, INTEGRATE)?;
    let (body, mut var) = strip_differential(args.first().copied().unwrap_or(""));
    let mut bounds = None;
    match &args[..] {
        [_, tail] => {
            if let Some((v, a, b)) = bound_tuple(tail) {
                var = Some(v);
                bounds = Some((a, b));
            } else if Identifier::is_valid_name(tail) {
                var = Some((*tail).to_owned());
            }
        }
        [_, v, a, b] if Identifier::is_valid_name(v) => {
            var = Some((*v).to_owned());
            bounds = Some(((*a).to_owned(), (*b).to_owned()));
        }
        _ => {}
    }
    Some(Classification::Integral {
        expr: body.to_owned(),
        var,
        bounds,
    })
}

fn derivative(text: &str) -> Option<Classification> {
    let args = keyword_arguments(text, DIFF)?;
    let var = match &args[..] {
        [_, v] if Identifier::is_valid_name(v) => Some((*v).to_owned()),
        _ => None,
    };
    Some(Classification::Derivative {
        expr: args.first().copied().unwrap_or("").to_owned(),
        var,
    })
}

fn limit(text: &str) -> Option<Classification> {
    if !text.contains(ARROW) {
        return None;
    }
    let args = keyword_arguments(text, LIMIT)?;
    let (expr, approach) = match &args[..] {
        [a, b] if b.contains(ARROW) => (a.to_string(), b.to_string()),
        [a, b] if a.contains(ARROW) => (b.to_string(), a.to_string()),
        // limit x->a f
        [tail] => {
            let (var, rest) = tail.split_once(ARROW)?;
            let rest = rest.trim_start();
            let split = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (
                rest[split..].trim().to_owned(),
                format!("{}{}{}", var, ARROW, &rest[..split]),
            )
        }
        _ => return None,
    };
    let (var, point) = approach.split_once(ARROW)?;
    let mut point = point.trim();
    let mut direction = Direction::Both;
    for (suffix, side) in [("+", Direction::Plus), ("-", Direction::Minus)] {
        if let Some(p) = point.strip_suffix(suffix) {
            if !p.trim().is_empty() {
                point = p.trim();
                direction = side;
                break;
            }
        }
    }
    Some(Classification::Limit {
        expr,
        var: var.trim().to_owned(),
        point: point.to_owned(),
        direction,
    })
}

fn series(text: &str) -> Option<Classification> {
    let (keyword, product) = match (find_keyword(text, SUM), find_keyword(text, PRODUCT)) {
        (Some(s), Some(p)) if p < s => (PRODUCT, true),
        (Some(_), _) => (SUM, false),
        (None, Some(_)) => (PRODUCT, true),
        (None, None) => return None,
    };
    let args = keyword_arguments(text, keyword)?;
    let mut series = Series {
        expr: args.first().copied().unwrap_or("").to_owned(),
        var: None,
        bounds: None,
    };
    match &args[..] {
        [_, tail] => {
            if let Some((v, a, b)) = bound_tuple(tail) {
                series.var = Some(v);
                series.bounds = Some((a, b));
            } else if Identifier::is_valid_name(tail) {
                series.var = Some((*tail).to_owned());
            }
        }
        [_, v, a, b] if Identifier::is_valid_name(v) => {
            series.var = Some((*v).to_owned());
            series.bounds = Some(((*a).to_owned(), (*b).to_owned()));
        }
        _ => {}
    }
    Some(if product {
        Classification::SeriesProduct(series)
    } else {
        Classification::SeriesSum(series)
    })
}

/// Factorials inside a comparison stay operands of the inequality.
fn factorial(text: &str) -> Option<Classification> {
    if comparison(text).is_some() {
        return None;
    }
    if let Some(at) = find_keyword(text, FACTORIAL) {
        let before = text[..at].trim();
        let after = text[at + FACTORIAL.len()..].trim();
        let expr = if after.is_empty() {
            format!("{FACTORIAL}({before})")
        } else if before.is_empty() && unwrap_parens(after).is_none() {
            format!("{FACTORIAL}({after})")
        } else {
            text.to_owned()
        };
        return Some(Classification::Factorial { expr });
    }
    let bang = text
        .char_indices()
        .any(|(i, c)| c == '!' && !text[i + 1..].starts_with('='));
    bang.then(|| Classification::Factorial {
        expr: text.to_owned(),
    })
}

fn inequality(text: &str) -> Option<Classification> {
    let text = strip_solve(text);
    let (at, relation, len) = comparison(text)?;
    Some(Classification::Inequality {
        lhs: text[..at].trim().to_owned(),
        relation,
        rhs: text[at + len..].trim().to_owned(),
    })
}

/// Byte offset of the first whole-word occurrence of `keyword`.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(keyword).map(|(i, _)| i).find(|&i| {
        let before = text[..i].chars().last().map_or(false, is_word);
        let after = text[i + keyword.len()..].chars().next().map_or(false, is_word);
        !before && !after
    })
}

/// The text after `keyword`, or the text before it when nothing follows.
fn after_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let at = find_keyword(text, keyword)?;
    let rest = text[at + keyword.len()..].trim();
    Some(if rest.is_empty() { text[..at].trim() } else { rest })
}

/// Comma separated operands of `keyword f, ...` or `keyword(f, ...)`.
fn keyword_arguments<'a>(text: &'a str, keyword: &str) -> Option<Vec<&'a str>> {
    let rest = after_keyword(text, keyword)?;
    let rest = unwrap_parens(rest).unwrap_or(rest);
    Some(split_top_level(rest))
}

fn strip_solve(text: &str) -> &str {
    match text.strip_prefix(SOLVE) {
        Some(rest) if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') => {
            let rest = rest.trim();
            unwrap_parens(rest).unwrap_or(rest)
        }
        _ => text,
    }
}

/// The inside of `text` when it is a single parenthesized group.
fn unwrap_parens(text: &str) -> Option<&str> {
    let text = text.trim();
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (i == text.len() - 1).then(|| text[1..i].trim());
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// `f dx` gives `f` and `x`.
fn strip_differential(body: &str) -> (&str, Option<String>) {
    if let Some((f, last)) = body.trim().rsplit_once(' ') {
        if let Some(var) = last.strip_prefix('d') {
            if Identifier::is_valid_name(var) && !f.trim().is_empty() {
                return (f.trim(), Some(var.to_owned()));
            }
        }
    }
    (body.trim(), None)
}

/// `(x, a, b)` gives `x`, `a` and `b`.
fn bound_tuple(text: &str) -> Option<(String, String, String)> {
    match split_top_level(unwrap_parens(text)?).as_slice() {
        [v, a, b] if Identifier::is_valid_name(v) => {
            Some(((*v).to_owned(), (*a).to_owned(), (*b).to_owned()))
        }
        _ => None,
    }
}

/// Sides of the first bare `=`. `==` counts as one equality.
fn split_equality(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' {
            let prev = if i > 0 { bytes[i - 1] } else { b' ' };
            if matches!(prev, b'<' | b'>' | b'!') {
                i += 1;
                continue;
            }
            let len = if bytes.get(i + 1) == Some(&b'=') { 2 } else { 1 };
            return Some((&text[..i], &text[i + len..]));
        }
        i += 1;
    }
    None
}

/// Offset, relation and length of the first comparison operator.
fn comparison(text: &str) -> Option<(usize, Relation, usize)> {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        let two = text.get(i..i + 2).and_then(Relation::from_str);
        if let Some(relation) = two {
            return Some((i, relation, 2));
        }
        let arrow = i > 0 && bytes[i - 1] == b'-' && bytes[i] == b'>';
        if matches!(bytes[i], b'<' | b'>') && !arrow {
            let relation = text.get(i..i + 1).and_then(Relation::from_str)?;
            return Some((i, relation, 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> ExpressionKind {
        classify(text).kind()
    }

    #[test]
    fn precedence() {
        assert_eq!(kind("2*x<=5"), ExpressionKind::Inequality);
        assert_eq!(kind("x!=3"), ExpressionKind::Inequality);
        assert_eq!(kind("x>=1"), ExpressionKind::Inequality);
        assert_eq!(kind("x**2-4=0"), ExpressionKind::Equation);
        assert_eq!(kind("x==2"), ExpressionKind::Equation);
        assert_eq!(kind("5!"), ExpressionKind::Factorial);
        assert_eq!(kind("2+2*2"), ExpressionKind::Arithmetic);
        assert_eq!(kind("integrate x dx"), ExpressionKind::Integral);
        assert_eq!(kind("diff x**3"), ExpressionKind::Derivative);
        assert_eq!(kind("limit sin(x)/x, x->0"), ExpressionKind::Limit);
        assert_eq!(kind("limit x"), ExpressionKind::Arithmetic);
        assert_eq!(kind("Sum n"), ExpressionKind::SeriesSum);
        assert_eq!(kind("Product(k, (k, 1, 4))"), ExpressionKind::SeriesProduct);
        assert_eq!(kind("integrate(x, (x, 0, 2))"), ExpressionKind::Integral);
        assert_eq!(kind("differences"), ExpressionKind::Arithmetic);
    }

    #[test]
    fn total() {
        for text in ["", "(((", "= =", "->", "!", "integrate", "solve", "<", "Sum(", "limit ->"] {
            let _ = classify(text);
        }
    }

    #[test]
    fn equations() {
        assert_eq!(
            classify("x**2 - 4 = 0"),
            Classification::Equation {
                lhs: "x**2 - 4".into(),
                rhs: "0".into(),
                var: None
            }
        );
        assert_eq!(
            classify("solve x**2 = 4"),
            Classification::Equation {
                lhs: "x**2".into(),
                rhs: "4".into(),
                var: None
            }
        );
        assert_eq!(
            classify("solve(a*y + 1 = 0, y)"),
            Classification::Equation {
                lhs: "a*y + 1".into(),
                rhs: "0".into(),
                var: Some("y".into())
            }
        );
        assert_eq!(
            classify("solve x**2 - 9"),
            Classification::Equation {
                lhs: "x**2 - 9".into(),
                rhs: "0".into(),
                var: None
            }
        );
        assert_eq!(kind("solve x > 2"), ExpressionKind::Inequality);
    }

    #[test]
    fn inequalities() {
        assert_eq!(
            classify("x**2 < 4"),
            Classification::Inequality {
                lhs: "x**2".into(),
                relation: Relation::Less,
                rhs: "4".into()
            }
        );
        assert_eq!(
            classify("1/x >= 0"),
            Classification::Inequality {
                lhs: "1/x".into(),
                relation: Relation::GreaterOrEqual,
                rhs: "0".into()
            }
        );
    }

    #[test]
    fn integrals() {
        assert_eq!(
            classify("integrate x**2"),
            Classification::Integral {
                expr: "x**2".into(),
                var: None,
                bounds: None
            }
        );
        assert_eq!(
            classify("integrate sin(t) dt"),
            Classification::Integral {
                expr: "sin(t)".into(),
                var: Some("t".into()),
                bounds: None
            }
        );
        assert_eq!(
            classify("integrate(x*y, y)"),
            Classification::Integral {
                expr: "x*y".into(),
                var: Some("y".into()),
                bounds: None
            }
        );
        assert_eq!(
            classify("integrate(x**2, (x, 0, 1))"),
            Classification::Integral {
                expr: "x**2".into(),
                var: Some("x".into()),
                bounds: Some(("0".into(), "1".into()))
            }
        );
    }

    #[test]
    fn derivatives() {
        assert_eq!(
            classify("diff(x*y, y)"),
            Classification::Derivative {
                expr: "x*y".into(),
                var: Some("y".into())
            }
        );
        assert_eq!(
            classify("diff sin(x)"),
            Classification::Derivative {
                expr: "sin(x)".into(),
                var: None
            }
        );
    }

    #[test]
    fn limits() {
        let expected = Classification::Limit {
            expr: "sin(x)/x".into(),
            var: "x".into(),
            point: "0".into(),
            direction: Direction::Both,
        };
        assert_eq!(classify("limit sin(x)/x, x->0"), expected);
        assert_eq!(classify("limit(sin(x)/x, x->0)"), expected);
        assert_eq!(classify("limit x->0 sin(x)/x"), expected);
        assert_eq!(classify("limit x -> 0 sin(x)/x"), expected);
        assert_eq!(
            classify("limit 1/x, x->0+"),
            Classification::Limit {
                expr: "1/x".into(),
                var: "x".into(),
                point: "0".into(),
                direction: Direction::Plus,
            }
        );
        assert_eq!(
            classify("limit 1/x, x->-oo"),
            Classification::Limit {
                expr: "1/x".into(),
                var: "x".into(),
                point: "-oo".into(),
                direction: Direction::Both,
            }
        );
    }

    #[test]
    fn series_forms() {
        assert_eq!(
            classify("Sum n"),
            Classification::SeriesSum(Series {
                expr: "n".into(),
                var: None,
                bounds: None
            })
        );
        assert_eq!(
            classify("Sum(1/k**2, (k, 1, 3))"),
            Classification::SeriesSum(Series {
                expr: "1/k**2".into(),
                var: Some("k".into()),
                bounds: Some(("1".into(), "3".into()))
            })
        );
    }

    #[test]
    fn factorials() {
        assert_eq!(
            classify("5!"),
            Classification::Factorial { expr: "5!".into() }
        );
        assert_eq!(
            classify("factorial 6"),
            Classification::Factorial {
                expr: "factorial(6)".into()
            }
        );
        assert_eq!(
            classify("10 factorial"),
            Classification::Factorial {
                expr: "factorial(10)".into()
            }
        );
        assert_eq!(
            classify("factorial(7)"),
            Classification::Factorial {
                expr: "factorial(7)".into()
            }
        );
    }

    #[test]
    fn factorials_in_comparisons() {
        assert_eq!(
            classify("3! < 7"),
            Classification::Inequality {
                lhs: "3!".into(),
                relation: Relation::Less,
                rhs: "7".into(),
            }
        );
        assert_eq!(kind("x! > 2"), ExpressionKind::Inequality);
        assert_eq!(kind("3! != 6"), ExpressionKind::Inequality);
        assert_eq!(kind("factorial(4) >= 20"), ExpressionKind::Inequality);
        assert_eq!(kind("3! + 1"), ExpressionKind::Factorial);
    }
}
