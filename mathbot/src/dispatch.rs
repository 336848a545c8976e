//! Routing of a classification to the algebra engine.

use std::{
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{self, RecvTimeoutError},
};

use algebra::{
    cancel::CancelToken,
    format_complex,
    inequality::{solve_inequality, RealSet},
    integrate::{integrate, integrate_definite},
    limit::{limit, LimitPoint, LimitValue},
    series,
    solve::{solve, Solution, SolutionSet},
    Constant, Error, Expr, Expression, Factor, Func, Identifier, FACTORIAL_LIMIT,
};
use itertools::Itertools;
use num::complex::Complex64;

use crate::{
    classify::{Classification, ExpressionKind, Series},
    variables::{free_variable, series_index, variable_or, IMPLICIT},
    Config,
};

/// A computed result in structured form.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Expr(Expr),
    /// Rendered with the constant of integration.
    Antiderivative(Expr),
    Solutions {
        var: Identifier,
        solutions: Vec<Solution>,
    },
    /// The equation holds for every value of `var`.
    Identity {
        var: Identifier,
    },
    Set {
        var: Identifier,
        set: RealSet,
    },
    Limit(LimitValue),
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Expr(expr) => write!(f, "{}", expr),
            Value::Antiderivative(expr) => write!(f, "{} + C", expr),
            Value::Solutions { solutions, .. } if solutions.is_empty() => write!(f, "нет решений"),
            Value::Solutions { var, solutions } => {
                write!(f, "{} ∈ {{{}}}", var, solutions.iter().join(", "))
            }
            Value::Identity { var } => write!(f, "любое значение {}", var),
            Value::Set { var, set } => write!(f, "{} ∈ {}", var, set),
            Value::Limit(value) => write!(f, "{}", value),
        }
    }
}

impl Value {
    /// Decimal form of the value, when it has a finite one.
    fn numeric(&self) -> Option<String> {
        let finite = |z: Complex64| z.is_finite().then(|| format_complex(z));
        let decimal = |expr: &Expr| {
            if !expr.is_constant() || expr.is_poisoned() {
                return None;
            }
            algebra::evaluate(expr).ok().and_then(finite)
        };
        match self {
            Value::Expr(expr) | Value::Limit(LimitValue::Exact(expr)) => decimal(expr),
            Value::Solutions { var, solutions } if !solutions.is_empty() => {
                let values: Option<Vec<_>> = solutions
                    .iter()
                    .map(|s| s.value().and_then(finite))
                    .collect();
                values.map(|v| format!("{} ∈ {{{}}}", var, v.join(", ")))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    Success {
        rendered: String,
        /// Decimal approximation, when it differs from `rendered`.
        numeric: Option<String>,
        value: Value,
    },
    Failure {
        message: String,
        /// The normalized text that failed.
        expression: String,
        kind: ExpressionKind,
    },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Success { .. })
    }
}

/// Runs `classification` on a thread pool of its own and waits at most
/// `config.timeout`. Errors and panics of the engine become a `Failure`.
///
/// On timeout the request's cancel token is set and the abandoned work stops
/// at the engine's next check.
pub fn dispatch(classification: &Classification, normalized: &str, config: &Config) -> DispatchOutcome {
    let kind = classification.kind();
    let failure = |message: String| {
        log::warn!("{} `{}` failed: {}", kind, normalized, message);
        DispatchOutcome::Failure {
            message,
            expression: normalized.to_owned(),
            kind,
        }
    };

    let token = CancelToken::new();
    let pool = {
        let token = token.clone();
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(move |i| format!("dispatch-{}-{}", kind, i))
            .start_handler(move |_| token.attach())
            .build()
    };
    let pool = match pool {
        Ok(pool) => pool,
        Err(err) => return failure(format!("не удалось запустить вычисление: {}", err)),
    };

    let (sender, receiver) = mpsc::channel();
    let job = classification.clone();
    let job_config = config.clone();
    // the pool shuts down once this job returns
    pool.spawn(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(|| compute(&job, &job_config)));
        // the receiver is gone after a timeout
        let _ = sender.send(result);
    });
    drop(pool);

    let received = receiver.recv_timeout(config.timeout);
    if matches!(received, Err(RecvTimeoutError::Timeout)) {
        token.cancel();
    }
    match received {
        Ok(Ok(Ok(value))) => {
            let rendered = value.to_string();
            let numeric = value.numeric().filter(|n| *n != rendered);
            log::debug!("{} `{}` = {}", kind, normalized, rendered);
            DispatchOutcome::Success {
                rendered,
                numeric,
                value,
            }
        }
        Ok(Ok(Err(err))) => failure(describe(&err)),
        Ok(Err(_)) => failure(String::from("внутренняя ошибка вычисления")),
        Err(RecvTimeoutError::Timeout) => failure(format!(
            "превышено время вычисления ({} мс)",
            config.timeout.as_millis()
        )),
        Err(RecvTimeoutError::Disconnected) => failure(String::from("вычисление прервано")),
    }
}

fn compute(classification: &Classification, config: &Config) -> algebra::Result<Value> {
    #[cfg(feature = "tracy")]
    profiling::scope!("compute");
    match classification {
        Classification::Arithmetic { expr } => Ok(Value::Expr(defined(parse(expr)?.simplify())?)),
        Classification::Equation { lhs, rhs, var } => {
            let f = (parse(lhs)? - parse(rhs)?).simplify();
            let var = variable(var.as_deref(), &f, free_variable)?;
            Ok(match solve(&f, &var)? {
                SolutionSet::Finite(solutions) => Value::Solutions { var, solutions },
                SolutionSet::All => Value::Identity { var },
            })
        }
        Classification::Inequality { lhs, relation, rhs } => {
            let (lhs, rhs) = (parse(lhs)?, parse(rhs)?);
            let var = free_variable(&(lhs.clone() - rhs.clone()));
            let set = solve_inequality(&lhs, *relation, &rhs, &var)?;
            Ok(Value::Set { var, set })
        }
        Classification::Derivative { expr, var } => {
            let f = parse(expr)?;
            let var = variable(var.as_deref(), &f, free_variable)?;
            Ok(Value::Expr(defined(f.derivative(&var)?.simplify())?))
        }
        Classification::Integral { expr, var, bounds } => {
            let f = parse(expr)?;
            let var = variable(var.as_deref(), &f, free_variable)?;
            match bounds {
                Some((a, b)) => Ok(Value::Expr(integrate_definite(&f, &var, &parse(a)?, &parse(b)?)?)),
                None => Ok(Value::Antiderivative(integrate(&f, &var)?)),
            }
        }
        Classification::Limit {
            expr,
            var,
            point,
            direction,
        } => {
            let f = parse(expr)?;
            let var = variable(Some(var.as_str()), &f, free_variable)?;
            let point = LimitPoint::from_expr(&parse(point)?);
            Ok(Value::Limit(limit(&f, &var, &point, *direction)?))
        }
        Classification::SeriesSum(s) => {
            let (f, var, lower, upper) = series_operands(s, config.sum_upper)?;
            Ok(Value::Expr(series::sum(&f, &var, &lower, &upper)?))
        }
        Classification::SeriesProduct(s) => {
            let (f, var, lower, upper) = series_operands(s, config.product_upper)?;
            Ok(Value::Expr(series::product(&f, &var, &lower, &upper)?))
        }
        Classification::Factorial { expr } => factorial(&parse(expr)?),
    }
}

fn parse(text: &str) -> algebra::Result<Expr> {
    text.parse()
}

/// Rejects `zoo` and `nan` results.
fn defined(expr: Expr) -> algebra::Result<Expr> {
    if expr.is_constant_of(Constant::ComplexInfinity) {
        Err(Error::DivisionByZero)
    } else if expr.is_poisoned() {
        Err(Error::Undefined)
    } else {
        Ok(expr)
    }
}

fn variable(name: Option<&str>, expr: &Expr, default: fn(&Expr) -> Identifier) -> algebra::Result<Identifier> {
    match name {
        Some(name) if !Identifier::is_valid_name(name) || IMPLICIT.is_constant(name) => {
            Err(Error::Unsupported(format!("`{}` is not a variable", name)))
        }
        _ => Ok(variable_or(name, expr, default)),
    }
}

fn series_operands(s: &Series, default_upper: i64) -> algebra::Result<(Expr, Identifier, Expr, Expr)> {
    let f = parse(&s.expr)?;
    let var = variable(s.var.as_deref(), &f, series_index)?;
    let (lower, upper) = match &s.bounds {
        Some((a, b)) => (parse(a)?, parse(b)?),
        None => (Expr::one(), Expr::number(default_upper)),
    };
    Ok((f, var, lower, upper))
}

fn factorial(expr: &Expr) -> algebra::Result<Value> {
    let is_factorial = |f: &Factor| matches!(f, Factor::Func(Func::Factorial, _));
    let invalid = expr.any(&|f| match f {
        Factor::Func(Func::Factorial, arg) => !arg
            .simplify()
            .as_num()
            .map_or(false, |n| n.is_integer() && !n.is_neg()),
        _ => false,
    });
    if invalid {
        return Err(Error::Unsupported(String::from(
            "factorial of anything but a non-negative integer",
        )));
    }
    let value = expr.simplify();
    if value.any(&is_factorial) {
        return Err(Error::RangeTooLarge(format!(
            "a factorial above {}",
            FACTORIAL_LIMIT
        )));
    }
    Ok(Value::Expr(value))
}

/// User facing text for an engine error.
fn describe(err: &Error) -> String {
    match err {
        Error::Parse(_) => format!("не удалось разобрать выражение ({})", err),
        Error::TooDeep => String::from("слишком глубокая вложенность скобок"),
        Error::FreeSymbol(id) => format!("у символа `{}` нет числового значения", id),
        Error::DivisionByZero => String::from("деление на ноль"),
        Error::Undefined => String::from("результат не определён"),
        Error::NotDifferentiable(f) => format!("`{}` не дифференцируется", f),
        Error::NoAntiderivative(f) => format!("не найдена элементарная первообразная для `{}`", f),
        Error::Unsolvable(f) => format!("не удалось решить `{}`", f),
        Error::Unsupported(what) => format!("не поддерживается: {}", what),
        Error::LimitDoesNotExist => String::from("предел не существует"),
        Error::LimitUndetermined => String::from("не удалось найти предел"),
        Error::RangeTooLarge(what) => format!("слишком большое вычисление: {}", what),
        Error::Cancelled => String::from("вычисление прервано"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::classify::classify;

    fn run(text: &str) -> DispatchOutcome {
        let _ = env_logger::builder().is_test(true).try_init();
        dispatch(&classify(text), text, &Config::default())
    }

    fn rendered(text: &str) -> String {
        match run(text) {
            DispatchOutcome::Success { rendered, .. } => rendered,
            failure => panic!("{text}: {failure:?}"),
        }
    }

    fn numeric(text: &str) -> Option<String> {
        match run(text) {
            DispatchOutcome::Success { numeric, .. } => numeric,
            failure => panic!("{text}: {failure:?}"),
        }
    }

    fn failed(text: &str) -> String {
        match run(text) {
            DispatchOutcome::Failure { message, .. } => message,
            success => panic!("{text}: {success:?}"),
        }
    }

    #[test]
    fn arithmetic() {
        assert_eq!(rendered("2+2*2"), "6");
        assert_eq!(rendered("(15-3)/4"), "3");
        assert_eq!(rendered("sqrt(16)"), "4");
        assert_eq!(rendered("1/3 + 1/6"), "1/2");
        assert_eq!(numeric("1/3 + 1/6").as_deref(), Some("0.5"));
        assert_eq!(numeric("pi*2").as_deref(), Some("6.283185307"));
        assert_eq!(numeric("6"), None);
        assert_eq!(numeric("x + 1"), None);
    }

    #[test]
    fn overflowing_decimals_are_dropped() {
        assert_eq!(numeric("10**10**10"), None);
        assert_eq!(numeric("2**2**2**2**2"), None);
        assert_eq!(numeric("factorial(5000)"), None);
        assert_eq!(numeric("2**100").as_deref(), Some("1.2676506e30"));
    }

    #[test]
    fn equations() {
        assert_eq!(rendered("x**2-4=0"), "x ∈ {-2, 2}");
        assert_eq!(rendered("2*y = 6"), "y ∈ {3}");
        assert_eq!(rendered("x = x"), "любое значение x");
        assert_eq!(rendered("0*x = 1"), "нет решений");
        assert_eq!(
            numeric("x**2 = 2").as_deref(),
            Some("x ∈ {-1.414213562, 1.414213562}")
        );
    }

    #[test]
    fn inequalities() {
        assert_eq!(rendered("2*x<=5"), "x ∈ (-oo, 5/2]");
        assert_eq!(rendered("x**2 > 4"), "x ∈ (-oo, -2) ∪ (2, oo)");
    }

    #[test]
    fn calculus() {
        assert_eq!(rendered("diff x**3"), "3*x**2");
        assert_eq!(rendered("diff(x*y, y)"), "x");
        assert_eq!(rendered("integrate x**2"), "x**3/3 + C");
        assert_eq!(rendered("integrate(x**2, (x, 0, 1))"), "1/3");
        assert_eq!(rendered("limit sin(x)/x, x->0"), "1");
        assert_eq!(rendered("limit 1/x, x->0+"), "oo");
        assert!(failed("limit 1/x, x->0").contains("не существует"));
        assert!(failed("integrate exp(x**2)").contains("первообразная"));
        assert!(failed("diff(x**2, pi)").contains("не поддерживается"));
        assert!(failed("integrate(x, (E, 0, 1))").contains("не поддерживается"));
    }

    #[test]
    fn series_defaults() {
        assert_eq!(rendered("Sum n"), "55");
        assert_eq!(rendered("Product n"), "120");
        assert_eq!(rendered("Sum(k**2, (k, 1, 3))"), "14");
        assert!(failed("Sum(n, (n, 1, oo))").contains("не поддерживается"));
    }

    #[test]
    fn factorials() {
        assert_eq!(rendered("5!"), "120");
        assert_eq!(rendered("factorial(6)"), "720");
        assert_eq!(rendered("3! + 1"), "7");
        assert!(failed("(1/2)!").contains("не поддерживается"));
        assert!(failed("x!").contains("не поддерживается"));
        assert!(failed("6000!").contains("слишком большое"));
    }

    #[test]
    fn failures_keep_the_expression() {
        match run("(2+") {
            DispatchOutcome::Failure {
                expression, kind, ..
            } => {
                assert_eq!(expression, "(2+");
                assert_eq!(kind, ExpressionKind::Arithmetic);
            }
            success => panic!("{success:?}"),
        }
        assert_eq!(failed("1/0"), "деление на ноль");
        assert_eq!(rendered("2+2"), "4");
    }

    #[test]
    fn timeout() {
        let config = Config {
            timeout: Duration::from_nanos(1),
            ..Config::default()
        };
        let outcome = dispatch(&classify("Sum(n**n, (n, 1, 2000))"), "Sum", &config);
        match outcome {
            DispatchOutcome::Failure { message, .. } => assert!(message.contains("время")),
            success => panic!("{success:?}"),
        }
    }

    #[test]
    fn requests_after_a_timeout_still_run() {
        let config = Config {
            timeout: Duration::from_millis(50),
            ..Config::default()
        };
        let heavy = "Sum(n**(n**4), (n, 1, 10000))";
        assert!(!dispatch(&classify(heavy), heavy, &config).is_success());
        assert_eq!(rendered("2+2"), "4");
        assert_eq!(rendered("diff x**3"), "3*x**2");
        assert_eq!(rendered("limit 1/x, x->0-"), "-oo");
        assert_eq!(rendered("Sum n"), "55");
    }

    #[test]
    fn runaway_series_are_refused() {
        assert!(failed("Product(n**n, (n, 1, 5000))").contains("слишком большое"));
        assert!(failed("Sum(x**n, (n, 1, 5000))").contains("слишком большое"));
    }
}
