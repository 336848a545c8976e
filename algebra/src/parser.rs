use std::{
    fmt::{self, Display},
    ops::{Deref, RangeInclusive},
    str::Chars,
};

use crate::{
    identifier::Identifier,
    value::{Constant, Expr, Factor, Fraction, Func},
};

/// Nesting limit for parentheses, calls and prefix operators.
pub const MAX_DEPTH: usize = 200;
/// Largest decimal exponent accepted in scientific notation.
const MAX_EXPONENT: i64 = 1000;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Pow),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Pow => "**",
        }
    }
}

/// Anything that can be applied to arguments.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Callable {
    Func(Func),
    Sqrt,
    Exp,
}

impl Callable {
    pub fn from_str(string: &str) -> Option<Self> {
        match string {
            "sqrt" => Some(Callable::Sqrt),
            "exp" => Some(Callable::Exp),
            "ln" => Some(Callable::Func(Func::Log)),
            _ => Func::from_str(string).map(Callable::Func),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Callable::Func(func) => func.as_str(),
            Callable::Sqrt => "sqrt",
            Callable::Exp => "exp",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Number(Fraction),
    Identifier(Identifier),
    Constant(Constant),
    Function(Callable),
    Operator(Operator),
    Ctrl(char),
    Bang,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Identifier(id) => write!(f, "{id}"),
            TokenKind::Constant(c) => write!(f, "{c}"),
            TokenKind::Function(c) => write!(f, "{}", c.as_str()),
            TokenKind::Operator(op) => write!(f, "{}", op.as_str()),
            TokenKind::Ctrl(c) => write!(f, "{c}"),
            TokenKind::Bang => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    kind: TokenKind,
    span: RangeInclusive<usize>,
}

impl Deref for Token {
    type Target = TokenKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

impl From<Identifier> for TokenKind {
    fn from(id: Identifier) -> Self {
        TokenKind::Identifier(id)
    }
}

impl From<Fraction> for TokenKind {
    fn from(num: Fraction) -> Self {
        TokenKind::Number(num)
    }
}

impl From<Callable> for TokenKind {
    fn from(callable: Callable) -> Self {
        TokenKind::Function(callable)
    }
}

impl From<Constant> for TokenKind {
    fn from(constant: Constant) -> Self {
        TokenKind::Constant(constant)
    }
}

impl From<Operator> for TokenKind {
    fn from(op: Operator) -> Self {
        TokenKind::Operator(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Syntax {
    UnexpectedChar(char),
    InvalidNumber,
}

impl Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            Syntax::InvalidNumber => write!(f, "invalid number"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error<T> {
    pub err: T,
    pub span: RangeInclusive<usize>,
}

impl<T> Error<T> {
    pub fn new(err: T, span: RangeInclusive<usize>) -> Self {
        Error { err, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Error<U> {
        Error {
            err: f(self.err),
            span: self.span,
        }
    }
}

impl<T: Display> Display for Error<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.err, self.span.start() + 1)
    }
}

pub struct TextParser<'a> {
    pos: usize,
    start_pos: usize,
    current: Option<char>,
    iter: Chars<'a>,
    tokens: Vec<Token>,
    errors: Vec<Error<Syntax>>,
}

impl<'a> TextParser<'a> {
    pub fn new(s: &'a str) -> Self {
        let mut iter = s.chars();
        let next = iter.next();
        TextParser {
            pos: 0,
            start_pos: 0,
            current: next,
            iter,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn start(&mut self) {
        self.start_pos = self.pos;
    }

    fn next(&mut self) -> Option<char> {
        self.current = self.iter.next();
        self.pos += 1;
        self.current
    }

    fn peek(&self) -> Option<char> {
        self.iter.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.iter.clone().nth(1)
    }

    fn span(&self) -> RangeInclusive<usize> {
        self.start_pos..=self.pos.saturating_sub(1).max(self.start_pos)
    }

    fn token(&mut self, token: impl Into<TokenKind>) {
        self.tokens.push(Token {
            kind: token.into(),
            span: self.span(),
        });
    }

    fn error(&mut self, kind: Syntax) {
        self.errors.push(Error {
            err: kind,
            span: self.span(),
        });
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.current.filter(|c| c.is_ascii_digit()) {
            digits.push(c);
            self.next();
        }
        digits
    }

    fn parse_number(&mut self) {
        let int = self.digits();
        let frac = if self.current == Some('.') {
            self.next();
            self.digits()
        } else {
            String::new()
        };

        let exponent = match (self.current, self.peek(), self.peek_second()) {
            (Some('e' | 'E'), Some(d), _) if d.is_ascii_digit() => {
                self.next();
                Some(self.digits())
            }
            (Some('e' | 'E'), Some(s @ ('+' | '-')), Some(d)) if d.is_ascii_digit() => {
                self.next();
                self.next();
                Some(format!("{s}{}", self.digits()))
            }
            _ => None,
        };

        let value = Fraction::from_decimal(&int, &frac).and_then(|value| match exponent {
            None => Some(value),
            Some(exp) => {
                let exp = exp.parse::<i64>().ok().filter(|e| e.abs() <= MAX_EXPONENT)?;
                Some(value * Fraction::whole(10).pow(exp)?)
            }
        });
        match value {
            Some(value) => self.token(value),
            None => self.error(Syntax::InvalidNumber),
        }
    }

    fn parse_word(&mut self) {
        let mut word = String::new();
        while let Some(c) = self.current.filter(|c| c.is_alphanumeric() || *c == '_') {
            word.push(c);
            self.next();
        }
        if let Some(callable) = Callable::from_str(&word) {
            self.token(callable);
        } else if let Some(constant) = Constant::from_str(&word) {
            self.token(constant);
        } else {
            self.token(Identifier::new(word));
        }
    }

    fn parse_raw(&mut self) {
        while let Some(current) = self.current {
            if current.is_whitespace() {
                self.next();
                continue;
            }
            self.start();
            if current.is_ascii_digit()
                || (current == '.' && self.peek().map_or(false, |c| c.is_ascii_digit()))
            {
                self.parse_number();
            } else if current.is_alphabetic() {
                self.parse_word();
            } else if current == '*' {
                if self.next() == Some('*') {
                    self.next();
                    self.token(Operator::Pow);
                } else {
                    self.token(Operator::Mul);
                }
            } else if let Some(op) = Operator::from_char(current) {
                self.next();
                self.token(op);
            } else if let Some(ctrl) = match current {
                '(' | '[' => Some('('),
                ')' | ']' => Some(')'),
                ',' => Some(','),
                _ => None,
            } {
                self.next();
                self.token(TokenKind::Ctrl(ctrl));
            } else if current == '!' {
                self.next();
                self.token(TokenKind::Bang);
            } else {
                self.next();
                self.error(Syntax::UnexpectedChar(current));
            }
        }
    }

    pub fn parse(mut self) -> Result<Vec<Token>, Vec<Error<Syntax>>> {
        self.parse_raw();
        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parse {
    ExpectedToken(TokenKind),
    ExpectedValue,
    UnexpectedToken(TokenKind),
    UnknownFunction(String),
    WrongArgumentCount(&'static str),
    TooDeep,
}

impl Display for Parse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parse::ExpectedToken(kind) => write!(f, "expected '{kind}'"),
            Parse::ExpectedValue => write!(f, "expected a value"),
            Parse::UnexpectedToken(kind) => write!(f, "unexpected '{kind}'"),
            Parse::UnknownFunction(name) => write!(f, "unknown function '{name}'"),
            Parse::WrongArgumentCount(name) => {
                write!(f, "wrong number of arguments for '{name}'")
            }
            Parse::TooDeep => write!(f, "nesting is too deep"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Full {
    Syntax(Syntax),
    Parse(Parse),
}

impl Display for Full {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Full::Syntax(e) => write!(f, "{e}"),
            Full::Parse(e) => write!(f, "{e}"),
        }
    }
}

/// Recursive descent over the token stream. Precedence from loosest to
/// tightest: `+ -`, `* /` and implicit multiplication, prefix `-`, `**`
/// (right associative), postfix `!`.
#[derive(Debug)]
pub struct TokenParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    errors: &'a mut Vec<Error<Parse>>,
}

impl<'a> TokenParser<'a> {
    pub fn new(tokens: &'a [Token], errors: &'a mut Vec<Error<Parse>>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            errors,
        }
    }

    fn error(&mut self, kind: Parse) {
        let span = match self.tokens.len() {
            0 => 0..=0,
            len => self.tokens[self.pos.min(len - 1)].span.clone(),
        };
        self.errors.push(Error { err: kind, span });
    }

    fn current(&self) -> Option<&'a TokenKind> {
        let tokens: &'a [Token] = self.tokens;
        tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, c: char) -> Option<()> {
        if self.current() == Some(&TokenKind::Ctrl(c)) {
            self.advance();
            Some(())
        } else {
            self.error(Parse::ExpectedToken(TokenKind::Ctrl(c)));
            None
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            self.error(Parse::TooDeep);
            None
        } else {
            f(self)
        };
        self.depth -= 1;
        result
    }

    fn starts_value(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Number(_)
                | TokenKind::Identifier(_)
                | TokenKind::Constant(_)
                | TokenKind::Function(_)
                | TokenKind::Ctrl('(')
        )
    }

    fn parse_sum(&mut self) -> Option<Expr> {
        let mut expr = self.parse_product()?;
        loop {
            match self.current() {
                Some(TokenKind::Operator(Operator::Add)) => {
                    self.advance();
                    expr = expr + self.parse_product()?;
                }
                Some(TokenKind::Operator(Operator::Sub)) => {
                    self.advance();
                    expr = expr - self.parse_product()?;
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_product(&mut self) -> Option<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            match self.current() {
                Some(TokenKind::Operator(Operator::Mul)) => {
                    self.advance();
                    expr = expr * self.parse_unary()?;
                }
                Some(TokenKind::Operator(Operator::Div)) => {
                    self.advance();
                    expr = expr * self.parse_unary()?.recip();
                }
                Some(kind) if Self::starts_value(kind) => {
                    expr = expr * self.parse_power()?;
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        match self.current() {
            Some(TokenKind::Operator(Operator::Sub)) => {
                self.advance();
                self.nested(|p| p.parse_unary()).map(|e| -e)
            }
            Some(TokenKind::Operator(Operator::Add)) => {
                self.advance();
                self.nested(|p| p.parse_unary())
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if let Some(TokenKind::Operator(Operator::Pow)) = self.current() {
            self.advance();
            let exp = self.nested(|p| p.parse_unary())?;
            Some(Expr::from(Factor::Pow(base, exp)))
        } else {
            Some(base)
        }
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.nested(|p| p.parse_atom())?;
        while let Some(TokenKind::Bang) = self.current() {
            self.advance();
            expr = Expr::from(Factor::Func(Func::Factorial, expr));
        }
        Some(expr)
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        match self.current() {
            Some(TokenKind::Number(n)) => {
                self.advance();
                Some(Expr::from(n.clone()))
            }
            Some(TokenKind::Constant(c)) => {
                self.advance();
                Some(Expr::from(Factor::Const(*c)))
            }
            Some(TokenKind::Identifier(id)) => {
                if id.as_str().chars().count() > 1
                    && self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Ctrl('('))
                {
                    self.error(Parse::UnknownFunction(id.to_string()));
                    return None;
                }
                self.advance();
                Some(Expr::from(Factor::Identifier(id.clone())))
            }
            Some(TokenKind::Function(callable)) => {
                self.advance();
                self.parse_call(*callable)
            }
            Some(TokenKind::Ctrl('(')) => {
                self.advance();
                let inner = self.parse_sum()?;
                self.expect(')')?;
                Some(Expr::from(Factor::Group(inner)))
            }
            Some(kind) => {
                self.error(Parse::UnexpectedToken(kind.clone()));
                None
            }
            None => {
                self.error(Parse::ExpectedValue);
                None
            }
        }
    }

    fn parse_arguments(&mut self) -> Option<Vec<Expr>> {
        let mut args = vec![self.parse_sum()?];
        while self.current() == Some(&TokenKind::Ctrl(',')) {
            self.advance();
            args.push(self.parse_sum()?);
        }
        self.expect(')')?;
        Some(args)
    }

    fn parse_call(&mut self, callable: Callable) -> Option<Expr> {
        let mut args = if self.current() == Some(&TokenKind::Ctrl('(')) {
            self.advance();
            self.parse_arguments()?
        } else {
            // `sin x`
            vec![self.parse_unary()?]
        };
        let expr = match (callable, args.len()) {
            (Callable::Sqrt, 1) => Factor::Pow(args.remove(0), Expr::from(Fraction::new(1, 2))),
            (Callable::Exp, 1) => Factor::Pow(Expr::from(Factor::Const(Constant::E)), args.remove(0)),
            (Callable::Func(Func::Log), 2) => {
                let base = args.remove(1);
                let arg = args.remove(0);
                return Some(
                    Expr::from(Factor::Func(Func::Log, arg))
                        * Expr::from(Factor::Func(Func::Log, base)).recip(),
                );
            }
            (Callable::Func(func), 1) => Factor::Func(func, args.remove(0)),
            _ => {
                self.error(Parse::WrongArgumentCount(callable.as_str()));
                return None;
            }
        };
        Some(Expr::from(expr))
    }

    pub fn parse(&mut self) -> Option<Expr> {
        let expr = self.parse_sum()?;
        if let Some(kind) = self.current() {
            self.error(Parse::UnexpectedToken(kind.clone()));
            return None;
        }
        Some(expr)
    }
}

/// Parses `value` into an unsimplified expression.
pub fn expr_from_str(value: &str) -> Result<Expr, Vec<Error<Full>>> {
    let tokens = TextParser::new(value).parse().map_err(|e| {
        e.into_iter()
            .map(|e| e.map(Full::Syntax))
            .collect::<Vec<_>>()
    })?;
    let mut errors = Vec::new();

    let mut parser = TokenParser::new(&tokens, &mut errors);
    let expr = parser.parse();
    match expr {
        Some(expr) if errors.is_empty() => Ok(expr),
        _ => Err(errors.into_iter().map(|e| e.map(Full::Parse)).collect()),
    }
}
