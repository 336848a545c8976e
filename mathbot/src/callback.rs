//! Inline keyboard payloads.

use crate::catalog::Category;

/// Telegram limits callback data to 64 bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
    /// `calc_<expression>`
    Calculate(String),
    /// `sym_<code>`
    Symbol(String),
    ExamplesMenu,
    SymbolsMenu,
    /// `cat_<code>`
    Category(Category),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Callback> {
        match data {
            "examples" | "menu_examples" => return Some(Callback::ExamplesMenu),
            "menu_symbols" => return Some(Callback::SymbolsMenu),
            _ => {}
        }
        if let Some(expr) = data.strip_prefix("calc_") {
            return (!expr.is_empty()).then(|| Callback::Calculate(expr.to_owned()));
        }
        if let Some(code) = data.strip_prefix("sym_") {
            return (!code.is_empty()).then(|| Callback::Symbol(code.to_owned()));
        }
        data.strip_prefix("cat_")
            .and_then(Category::from_code)
            .map(Callback::Category)
    }

    /// The payload, unless it is too long for a button.
    pub fn encode(&self) -> Option<String> {
        let data = match self {
            Callback::Calculate(expr) => format!("calc_{}", expr),
            Callback::Symbol(code) => format!("sym_{}", code),
            Callback::ExamplesMenu => String::from("menu_examples"),
            Callback::SymbolsMenu => String::from("menu_symbols"),
            Callback::Category(category) => format!("cat_{}", category.code()),
        };
        (data.len() <= MAX_CALLBACK_BYTES).then(|| data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(
            Callback::parse("calc_2+2*2"),
            Some(Callback::Calculate("2+2*2".into()))
        );
        assert_eq!(Callback::parse("sym_alpha"), Some(Callback::Symbol("alpha".into())));
        assert_eq!(Callback::parse("examples"), Some(Callback::ExamplesMenu));
        assert_eq!(Callback::parse("menu_examples"), Some(Callback::ExamplesMenu));
        assert_eq!(Callback::parse("menu_symbols"), Some(Callback::SymbolsMenu));
        assert_eq!(
            Callback::parse("cat_calc"),
            Some(Callback::Category(Category::Calculus))
        );
        assert_eq!(Callback::parse("cat_nope"), None);
        assert_eq!(Callback::parse("calc_"), None);
        assert_eq!(Callback::parse("other"), None);
    }

    #[test]
    fn encode() {
        for callback in [
            Callback::Calculate("x^2-4=0".into()),
            Callback::Symbol("le".into()),
            Callback::ExamplesMenu,
            Callback::SymbolsMenu,
            Callback::Category(Category::Series),
        ] {
            let data = callback.encode().unwrap();
            assert_eq!(Callback::parse(&data), Some(callback));
        }
        assert_eq!(Callback::Calculate("1+".repeat(40)).encode(), None);
    }
}
