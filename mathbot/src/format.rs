//! Telegram Markdown rendering of results and errors.

use crate::{Config, DispatchOutcome, ExpressionKind, InputError, Report};

const TRUNCATED: &str = "… (результат обрезан)";

pub const USAGE_HINT: &str =
    "💡 Попробуйте: `2+2*2`, `x^2-4=0`, `diff x^3`, `integrate x^2 dx`, `limit sin(x)/x, x->0`";

/// Renders the outcome of a request.
pub fn render(report: &Report, config: &Config) -> String {
    match &report.outcome {
        DispatchOutcome::Success {
            rendered, numeric, ..
        } => success(&report.input, report.kind, rendered, numeric.as_deref(), config),
        DispatchOutcome::Failure {
            message,
            expression,
            ..
        } => failure(message, expression),
    }
}

pub fn success(
    input: &str,
    kind: ExpressionKind,
    rendered: &str,
    numeric: Option<&str>,
    config: &Config,
) -> String {
    let mut text = format!(
        "🎯 *Пример:* {}\n📚 *Решение:* {}: {}",
        code(input),
        kind.label(),
        code(&truncate(rendered, config.max_output_chars))
    );
    if let Some(numeric) = numeric {
        text.push_str(&format!("\n≈ {}", code(&truncate(numeric, config.max_output_chars))));
    }
    text
}

pub fn failure(message: &str, expression: &str) -> String {
    format!(
        "❌ *Ошибка:* {}\n🔎 Выражение: {}\n{}",
        message,
        code(expression),
        USAGE_HINT
    )
}

pub fn input_error(err: &InputError) -> String {
    match err {
        InputError::Empty => String::from("❌ Пустое выражение"),
        InputError::TooLong { limit, .. } => {
            format!("❌ Слишком длинное выражение (не больше {} символов)", limit)
        }
    }
}

/// An inline code span. Backticks cannot be escaped inside one.
pub fn code(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

/// Escapes the characters that start Markdown entities.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '[' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((at, _)) => format!("{}{}", &text[..at], TRUNCATED),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_layout() {
        let config = Config::default();
        assert_eq!(
            success("2+2*2", ExpressionKind::Arithmetic, "6", None, &config),
            "🎯 *Пример:* `2+2*2`\n📚 *Решение:* Результат: `6`"
        );
        assert_eq!(
            success("pi*2", ExpressionKind::Arithmetic, "2*pi", Some("6.283185307"), &config),
            "🎯 *Пример:* `pi*2`\n📚 *Решение:* Результат: `2*pi`\n≈ `6.283185307`"
        );
    }

    #[test]
    fn backticks_are_neutralised() {
        assert_eq!(code("a`b"), "`a'b`");
        let text = failure("деление на ноль", "1/0`");
        assert!(text.contains("`1/0'`"));
        assert!(text.ends_with(USAGE_HINT));
    }

    #[test]
    fn long_results_are_cut() {
        let config = Config {
            max_output_chars: 5,
            ..Config::default()
        };
        let text = success("x", ExpressionKind::Arithmetic, "абвгдеж", None, &config);
        assert!(text.contains("`абвгд… (результат обрезан)`"));
        assert_eq!(truncate("short", 5), "short");
    }

    #[test]
    fn input_errors() {
        assert_eq!(input_error(&InputError::Empty), "❌ Пустое выражение");
        assert!(input_error(&InputError::TooLong {
            length: 300,
            limit: 200
        })
        .starts_with("❌ Слишком длинное выражение"));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape("a_b*c[d`"), "a\\_b\\*c\\[d\\`");
        assert_eq!(escape("2+2"), "2+2");
    }
}
