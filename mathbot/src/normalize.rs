//! Rewriting of informal math text into canonical algebraic syntax.

use crate::symbols::SYMBOLS;

const SUPERSCRIPT_DIGITS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];
const SUPERSCRIPT_MINUS: char = '⁻';
const SUPERSCRIPT_PLUS: char = '⁺';

const VULGAR_FRACTIONS: &[(char, u8, u8)] = &[
    ('½', 1, 2),
    ('⅓', 1, 3),
    ('⅔', 2, 3),
    ('¼', 1, 4),
    ('¾', 3, 4),
    ('⅕', 1, 5),
    ('⅖', 2, 5),
    ('⅗', 3, 5),
    ('⅘', 4, 5),
    ('⅙', 1, 6),
    ('⅚', 5, 6),
    ('⅐', 1, 7),
    ('⅛', 1, 8),
    ('⅜', 3, 8),
    ('⅝', 5, 8),
    ('⅞', 7, 8),
    ('⅑', 1, 9),
    ('⅒', 1, 10),
];

/// Rewrites `raw` in a single left-to-right pass. At each position the
/// longest alias wins and every span of the input is rewritten at most once,
/// so `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        let after = &rest[c.len_utf8()..];
        let consumed = if c.is_ascii_alphabetic() {
            let len = word_len(rest);
            out.push_str(canonical_word(&rest[..len]));
            len
        } else if c == ',' && depth == 0 && is_decimal_comma(&out, after) {
            out.push('.');
            1
        } else if c == '√' {
            c.len_utf8() + sqrt(after, &mut out, &mut depth)
        } else if let Some((exponent, len)) = superscript(rest) {
            out.push_str("**");
            out.push_str(&exponent);
            len
        } else if c == SUPERSCRIPT_PLUS || c == SUPERSCRIPT_MINUS {
            out.push(if c == SUPERSCRIPT_PLUS { '+' } else { '-' });
            c.len_utf8()
        } else if let Some((p, q)) = vulgar_fraction(c) {
            out.push_str(&format!("({p}/{q})"));
            c.len_utf8()
        } else if let Some(entry) = SYMBOLS.glyph(rest) {
            let len = entry.pattern.len();
            push_padded(&mut out, &entry.canonical, rest[len..].chars().next());
            len
        } else {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
            out.push(c);
            c.len_utf8()
        };
        rest = &rest[consumed..];
    }
    let normalized = out.split_whitespace().collect::<Vec<_>>().join(" ");
    log::debug!("normalized {:?} to {:?}", raw, normalized);
    normalized
}

fn word_len(text: &str) -> usize {
    text.find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len())
}

fn canonical_word(word: &str) -> &str {
    SYMBOLS.word(word).map_or(word, |e| e.canonical.as_str())
}

/// A comma directly between two digits outside any group is a decimal
/// separator.
fn is_decimal_comma(before: &str, after: &str) -> bool {
    before.chars().last().map_or(false, |c| c.is_ascii_digit())
        && after.chars().next().map_or(false, |c| c.is_ascii_digit())
}

/// Pads a produced word with spaces so it never fuses with a neighbour.
fn push_padded(out: &mut String, canonical: &str, next: Option<char>) {
    let is_word = canonical.starts_with(|c: char| c.is_ascii_alphabetic());
    if is_word && out.chars().last().map_or(false, |c| c.is_alphanumeric()) {
        out.push(' ');
    }
    out.push_str(canonical);
    if is_word && next.map_or(false, |c| c.is_alphanumeric()) {
        out.push(' ');
    }
}

/// Rewrites the atom after `√` and returns how many bytes of `text` it used.
fn sqrt(text: &str, out: &mut String, depth: &mut usize) -> usize {
    let skipped = text.len() - text.trim_start().len();
    let text = &text[skipped..];
    let Some(c) = text.chars().next() else {
        out.push_str("sqrt");
        return skipped;
    };
    let (atom, len) = if c == '(' {
        *depth += 1;
        out.push_str("sqrt(");
        return skipped + 1;
    } else if c.is_ascii_digit() || c == '.' {
        let len = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(text.len());
        (text[..len].to_owned(), len)
    } else if c.is_ascii_alphabetic() {
        let len = word_len(text);
        (canonical_word(&text[..len]).to_owned(), len)
    } else if let Some(entry) = SYMBOLS.glyph(text).filter(|e| e.canonical.starts_with(|c: char| c.is_ascii_alphabetic())) {
        (entry.canonical.clone(), entry.pattern.len())
    } else {
        out.push_str("sqrt");
        return skipped;
    };
    if out.chars().last().map_or(false, |c| c.is_alphanumeric()) {
        out.push(' ');
    }
    out.push_str("sqrt(");
    out.push_str(&atom);
    out.push(')');
    skipped + len
}

/// `**` exponent for a run of superscript characters at the start of `text`.
fn superscript(text: &str) -> Option<(String, usize)> {
    let mut exponent = String::new();
    let mut len = 0;
    for c in text.chars() {
        if let Some(d) = SUPERSCRIPT_DIGITS.iter().position(|s| *s == c) {
            exponent.push(char::from(b'0' + d as u8));
        } else if c == SUPERSCRIPT_MINUS && exponent.is_empty() {
            exponent.push('-');
        } else {
            break;
        }
        len += c.len_utf8();
    }
    if exponent.chars().any(|c| c.is_ascii_digit()) {
        Some((exponent, len))
    } else {
        None
    }
}

fn vulgar_fraction(c: char) -> Option<(u8, u8)> {
    VULGAR_FRACTIONS
        .iter()
        .find(|(f, _, _)| *f == c)
        .map(|(_, p, q)| (*p, *q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_and_words() {
        assert_eq!(normalize("2×3÷4"), "2*3/4");
        assert_eq!(normalize("x^2 − 4 = 0"), "x**2 - 4 = 0");
        assert_eq!(normalize("x ≤ 5"), "x <= 5");
        assert_eq!(normalize("ln(x)"), "log(x)");
        assert_eq!(normalize("SIN(x) + Arctg(x)"), "sin(x) + atan(x)");
        assert_eq!(normalize("∫ x dx"), "integrate x dx");
        assert_eq!(normalize("lim x→0 sin(x)/x"), "limit x->0 sin(x)/x");
        assert_eq!(normalize("∑ n"), "Sum n");
    }

    #[test]
    fn whole_words_only() {
        assert_eq!(normalize("integrate x"), "integrate x");
        assert_eq!(normalize("int x"), "integrate x");
        assert_eq!(normalize("sinh(x)"), "sinh(x)");
        assert_eq!(normalize("e + E + I"), "e + E + I");
        assert_eq!(normalize("pint"), "pint");
    }

    #[test]
    fn greek_letters() {
        assert_eq!(normalize("2π"), "2 pi");
        assert_eq!(normalize("απ"), "alpha pi");
        assert_eq!(normalize("sin(θ)"), "sin(theta)");
        assert_eq!(normalize("Δx"), "Delta x");
        assert_eq!(normalize("Σ n"), "Sum n");
    }

    #[test]
    fn roots_powers_and_fractions() {
        assert_eq!(normalize("√16"), "sqrt(16)");
        assert_eq!(normalize("√(x+1)"), "sqrt(x+1)");
        assert_eq!(normalize("2√x"), "2 sqrt(x)");
        assert_eq!(normalize("√π"), "sqrt(pi)");
        assert_eq!(normalize("x²+y³"), "x**2+y**3");
        assert_eq!(normalize("x⁻¹"), "x**-1");
        assert_eq!(normalize("½x"), "(1/2)x");
        assert_eq!(normalize("x→0⁺"), "x->0+");
    }

    #[test]
    fn decimal_comma() {
        assert_eq!(normalize("1,5 + 2,25"), "1.5 + 2.25");
        assert_eq!(normalize("Sum(n, (n, 1,10))"), "Sum(n, (n, 1,10))");
        assert_eq!(normalize("limit 1/x, x->0"), "limit 1/x, x->0");
        assert_eq!(normalize("x²,5"), "x**2.5");
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize("  2 \t+\n 2  "), "2 + 2");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn idempotent() {
        for s in [
            "2π r²",
            "√√16",
            "x^2 − 4 = 0",
            "∫ sin(θ) dθ",
            "1,5·α",
            "lim x→0⁺ 1/x",
            "SUM(k, (k, 1, 10))",
            "√ (2)",
            "3!≠6",
            "½,5",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "{s}");
        }
    }
}
