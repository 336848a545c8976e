//! The alias table that maps informal notation to canonical tokens.

use std::collections::HashMap;

use num::FromPrimitive;
use num_derive::FromPrimitive;
use once_cell::sync::Lazy;

#[derive(PartialEq, Eq, Hash, Clone, Copy, FromPrimitive, Debug)]
#[repr(u32)]
pub enum GreekLetter {
    Alpha = 0,
    Beta = 1,
    Gamma = 2,
    Delta = 3,
    Epsilon = 4,
    Zeta = 5,
    Eta = 6,
    Theta = 7,
    Iota = 8,
    Kappa = 9,
    Lambda = 10,
    Mu = 11,
    Nu = 12,
    Xi = 13,
    Omicron = 14,
    Pi = 15,
    Rho = 16,
    Sigma = 18,
    Tau = 19,
    Upsilon = 20,
    Phi = 21,
    Chi = 22,
    Psi = 23,
    Omega = 24,
}

impl GreekLetter {
    /// The letter and whether it is uppercase.
    pub fn from_char(c: char) -> Option<(Self, bool)> {
        match c {
            'ς' => Some((GreekLetter::Sigma, false)),
            'α'..='ω' => Some((FromPrimitive::from_u32(c as u32 - 'α' as u32)?, false)),
            'Α'..='Ω' => Some((FromPrimitive::from_u32(c as u32 - 'Α' as u32)?, true)),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            GreekLetter::Alpha => "alpha",
            GreekLetter::Beta => "beta",
            GreekLetter::Gamma => "gamma",
            GreekLetter::Delta => "delta",
            GreekLetter::Epsilon => "epsilon",
            GreekLetter::Zeta => "zeta",
            GreekLetter::Eta => "eta",
            GreekLetter::Theta => "theta",
            GreekLetter::Iota => "iota",
            GreekLetter::Kappa => "kappa",
            GreekLetter::Lambda => "lambda",
            GreekLetter::Mu => "mu",
            GreekLetter::Nu => "nu",
            GreekLetter::Xi => "xi",
            GreekLetter::Omicron => "omicron",
            GreekLetter::Pi => "pi",
            GreekLetter::Rho => "rho",
            GreekLetter::Sigma => "sigma",
            GreekLetter::Tau => "tau",
            GreekLetter::Upsilon => "upsilon",
            GreekLetter::Phi => "phi",
            GreekLetter::Chi => "chi",
            GreekLetter::Psi => "psi",
            GreekLetter::Omega => "omega",
        }
    }

    /// The name with its first letter capitalized, for uppercase glyphs.
    pub fn capitalized(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Matched literally anywhere.
    Glyph,
    /// Matched as a whole ASCII word, ignoring case.
    Word,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    pub pattern: String,
    pub canonical: String,
    pub kind: PatternKind,
    /// Key for `sym_<code>` lookups.
    pub code: String,
    pub description: String,
}

impl SymbolEntry {
    fn glyph(pattern: &str, canonical: &str, code: &str, description: &str) -> Self {
        SymbolEntry {
            pattern: pattern.to_owned(),
            canonical: canonical.to_owned(),
            kind: PatternKind::Glyph,
            code: code.to_owned(),
            description: description.to_owned(),
        }
    }

    fn word(pattern: &str, canonical: &str, description: &str) -> Self {
        SymbolEntry {
            pattern: pattern.to_owned(),
            canonical: canonical.to_owned(),
            kind: PatternKind::Word,
            code: format!("kw_{pattern}"),
            description: description.to_owned(),
        }
    }
}

const GLYPHS: &[(&str, &str, &str, &str)] = &[
    ("×", "*", "times", "умножение"),
    ("·", "*", "cdot", "умножение"),
    ("⋅", "*", "sdot", "умножение"),
    ("∙", "*", "bullet", "умножение"),
    ("∗", "*", "ast", "умножение"),
    ("÷", "/", "div", "деление"),
    ("∕", "/", "slash", "деление"),
    ("⁄", "/", "fracslash", "деление"),
    (":", "/", "colon", "деление"),
    ("−", "-", "minus", "минус"),
    ("–", "-", "ndash", "минус"),
    ("^", "**", "caret", "возведение в степень"),
    ("≤", "<=", "le", "меньше или равно"),
    ("⩽", "<=", "leslant", "меньше или равно"),
    ("≥", ">=", "ge", "больше или равно"),
    ("⩾", ">=", "geslant", "больше или равно"),
    ("≠", "!=", "ne", "не равно"),
    ("∞", "oo", "inf", "бесконечность"),
    ("ℯ", "E", "euler", "число Эйлера e"),
    ("∫", "integrate", "int", "интеграл"),
    ("∑", "Sum", "sum", "сумма ряда"),
    ("∏", "Product", "prod", "произведение"),
    ("→", "->", "to", "стремится к (предел)"),
    ("⟶", "->", "longto", "стремится к (предел)"),
];

const WORDS: &[(&str, &str, &str)] = &[
    ("ln", "log", "натуральный логарифм"),
    ("log", "log", "натуральный логарифм"),
    ("exp", "exp", "экспонента"),
    ("sqrt", "sqrt", "квадратный корень"),
    ("root", "sqrt", "квадратный корень"),
    ("abs", "abs", "модуль"),
    ("sin", "sin", "синус"),
    ("cos", "cos", "косинус"),
    ("tan", "tan", "тангенс"),
    ("tg", "tan", "тангенс"),
    ("cot", "cot", "котангенс"),
    ("ctg", "cot", "котангенс"),
    ("cotan", "cot", "котангенс"),
    ("asin", "asin", "арксинус"),
    ("arcsin", "asin", "арксинус"),
    ("acos", "acos", "арккосинус"),
    ("arccos", "acos", "арккосинус"),
    ("atan", "atan", "арктангенс"),
    ("arctan", "atan", "арктангенс"),
    ("arctg", "atan", "арктангенс"),
    ("sinh", "sinh", "гиперболический синус"),
    ("cosh", "cosh", "гиперболический косинус"),
    ("tanh", "tanh", "гиперболический тангенс"),
    ("pi", "pi", "число пи"),
    ("oo", "oo", "бесконечность"),
    ("inf", "oo", "бесконечность"),
    ("infinity", "oo", "бесконечность"),
    ("integrate", "integrate", "интеграл"),
    ("integral", "integrate", "интеграл"),
    ("int", "integrate", "интеграл"),
    ("diff", "diff", "производная"),
    ("derivative", "diff", "производная"),
    ("derive", "diff", "производная"),
    ("limit", "limit", "предел"),
    ("lim", "limit", "предел"),
    ("sum", "Sum", "сумма ряда"),
    ("product", "Product", "произведение"),
    ("prod", "Product", "произведение"),
    ("factorial", "factorial", "факториал"),
    ("fact", "factorial", "факториал"),
    ("solve", "solve", "решить уравнение"),
];

pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    /// Indices of glyph entries, longest pattern first.
    glyphs: Vec<usize>,
    /// Lowercased word pattern to entry index.
    words: HashMap<String, usize>,
}

impl SymbolTable {
    fn build() -> Self {
        let mut entries = GLYPHS
            .iter()
            .map(|(p, c, code, d)| SymbolEntry::glyph(p, c, code, d))
            .collect::<Vec<_>>();
        for c in ('α'..='ω').chain('Α'..='Ω') {
            let Some((letter, upper)) = GreekLetter::from_char(c) else {
                continue;
            };
            let glyph = c.to_string();
            let entry = match (letter, upper) {
                (GreekLetter::Sigma, true) => SymbolEntry::glyph(&glyph, "Sum", "Sigma", "сумма ряда"),
                (GreekLetter::Pi, true) => SymbolEntry::glyph(&glyph, "Product", "Pi", "произведение"),
                (_, true) => SymbolEntry::glyph(
                    &glyph,
                    &letter.capitalized(),
                    &letter.capitalized(),
                    &format!("греческая буква {}", letter.capitalized()),
                ),
                (_, false) => SymbolEntry::glyph(
                    &glyph,
                    letter.name(),
                    if c == 'ς' { "finalsigma" } else { letter.name() },
                    &format!("греческая буква {}", letter.name()),
                ),
            };
            entries.push(entry);
        }
        entries.extend(WORDS.iter().map(|(p, c, d)| SymbolEntry::word(p, c, d)));

        let mut glyphs = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == PatternKind::Glyph)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        glyphs.sort_by_key(|i| std::cmp::Reverse(entries[*i].pattern.chars().count()));
        let words = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == PatternKind::Word)
            .map(|(i, e)| (e.pattern.to_ascii_lowercase(), i))
            .collect();
        SymbolTable {
            entries,
            glyphs,
            words,
        }
    }

    /// The longest glyph pattern at the start of `text`.
    pub fn glyph(&self, text: &str) -> Option<&SymbolEntry> {
        self.glyphs
            .iter()
            .map(|i| &self.entries[*i])
            .find(|e| text.starts_with(e.pattern.as_str()))
    }

    /// The entry for a whole word. Single letters are never aliases.
    pub fn word(&self, word: &str) -> Option<&SymbolEntry> {
        if word.chars().count() < 2 {
            return None;
        }
        self.words
            .get(&word.to_ascii_lowercase())
            .map(|i| &self.entries[*i])
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }
}

pub static SYMBOLS: Lazy<SymbolTable> = Lazy::new(SymbolTable::build);

/// Every alias with its glossary code and description.
pub fn glossary() -> &'static [SymbolEntry] {
    SYMBOLS.entries()
}

pub fn lookup_symbol(code: &str) -> Option<&'static SymbolEntry> {
    SYMBOLS.entries().iter().find(|e| e.code == code)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn greek_letters_round_trip() {
        assert_eq!(GreekLetter::from_char('α'), Some((GreekLetter::Alpha, false)));
        assert_eq!(GreekLetter::from_char('Δ'), Some((GreekLetter::Delta, true)));
        assert_eq!(GreekLetter::from_char('ω'), Some((GreekLetter::Omega, false)));
        assert_eq!(GreekLetter::from_char('ς'), Some((GreekLetter::Sigma, false)));
        assert_eq!(GreekLetter::from_char('a'), None);
        assert_eq!(GreekLetter::from_char('\u{3a2}'), None);
        assert_eq!(GreekLetter::Theta.capitalized(), "Theta");
    }

    #[test]
    fn every_greek_glyph_is_an_alias() {
        assert!(('α'..='ω')
            .chain('Α'..='Ω')
            .filter(|c| *c != '\u{3a2}')
            .all(|c| SYMBOLS.glyph(&c.to_string()).is_some()));
        assert_eq!(SYMBOLS.glyph("θ").unwrap().canonical, "theta");
        assert_eq!(SYMBOLS.glyph("Δ").unwrap().canonical, "Delta");
        assert_eq!(SYMBOLS.glyph("Σ").unwrap().canonical, "Sum");
        assert_eq!(SYMBOLS.glyph("ς").unwrap().code, "finalsigma");
        assert_eq!(lookup_symbol("omega").unwrap().pattern, "ω");
    }

    #[test]
    fn patterns_and_codes_are_unique() {
        let mut patterns = HashSet::new();
        let mut codes = HashSet::new();
        for entry in glossary() {
            let key = match entry.kind {
                PatternKind::Glyph => entry.pattern.clone(),
                PatternKind::Word => entry.pattern.to_ascii_lowercase(),
            };
            assert!(patterns.insert((entry.kind, key)), "duplicate pattern {}", entry.pattern);
            assert!(codes.insert(entry.code.clone()), "duplicate code {}", entry.code);
        }
    }

    #[test]
    fn canonical_tokens_are_stable() {
        for entry in glossary() {
            if let Some(other) = SYMBOLS.glyph(&entry.canonical) {
                assert_eq!(
                    other.canonical, entry.canonical,
                    "{} -> {} is rewritten again to {}",
                    entry.pattern, entry.canonical, other.canonical
                );
            }
            if let Some(other) = SYMBOLS.word(&entry.canonical) {
                assert_eq!(
                    other.canonical, entry.canonical,
                    "{} -> {} is rewritten again to {}",
                    entry.pattern, entry.canonical, other.canonical
                );
            }
        }
    }

    #[test]
    fn lookups() {
        assert_eq!(SYMBOLS.glyph("×2").unwrap().canonical, "*");
        assert_eq!(SYMBOLS.word("LN").unwrap().canonical, "log");
        assert_eq!(SYMBOLS.word("Sum").unwrap().canonical, "Sum");
        assert!(SYMBOLS.word("e").is_none());
        assert!(SYMBOLS.word("integrated").is_none());
        assert_eq!(lookup_symbol("alpha").unwrap().pattern, "α");
        assert_eq!(lookup_symbol("le").unwrap().canonical, "<=");
        assert!(lookup_symbol("nope").is_none());
    }
}
