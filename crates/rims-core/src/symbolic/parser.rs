//! Recursive-descent parser for LaTeX-flavoured and plain-text math.
//!
//! Accepts the subset that shows up in graded answers: numbers, single-letter
//! and subscripted symbols, greek letters, `+ - * / ^`, implicit
//! multiplication, `\frac`/`\dfrac`/`\tfrac`, `\sqrt[n]{}`, `\cdot`/`\times`/`\div`,
//! `\left`/`\right` delimiters, `|x|`, `!`, trig/log/exp functions and a
//! single top-level `=`. Anything else is a parse error, which callers treat
//! as "not equivalent".

use super::expr::{Constant, Expr, Func};
use super::SymbolicError;

/// Result of parsing a piece of math text.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Expr(Expr),
    Equation(Expr, Expr),
}

/// Nesting limit for groups, signs, exponents and postfix operators. The
/// parser and every pass over its output recurse, so deeper input is
/// rejected instead of exhausting the stack.
pub const MAX_DEPTH: usize = 64;

const GREEK: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "vartheta", "iota", "kappa", "lambda", "mu", "nu", "xi", "rho", "sigma", "tau", "upsilon",
    "phi", "varphi", "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Sigma",
    "Phi", "Psi", "Omega",
];

/// Plain-text words recognized inside a run of letters, longest first.
const WORDS: &[&str] = &[
    "arcsin", "arccos", "arctan", "sqrt", "sinh", "cosh", "tanh", "asin", "acos", "atan", "sin",
    "cos", "tan", "sec", "csc", "cot", "exp", "log", "ln", "pi",
];

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Letter(char),
    Word(&'static str),
    Cmd(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Underscore,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Bar,
    Bang,
    Eq,
}

fn tokenize(input: &str) -> Result<Vec<Tok>, SymbolicError> {
    let chars: Vec<char> = input.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut seen_dot = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                    seen_dot |= chars[i] == '.';
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text == "." {
                    // `\left.` / `\right.` are invisible delimiters.
                    if matches!(toks.last(), Some(Tok::Cmd(c)) if c == "left" || c == "right") {
                        continue;
                    }
                    return Err(SymbolicError::Parse(format!("stray '.' in {input:?}")));
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|e| SymbolicError::Parse(format!("bad number {text:?}: {e}")))?;
                toks.push(Tok::Num(value));
            }
            '\\' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                if i == start {
                    // Single-character command such as `\,` or `\{`.
                    let Some(&sym) = chars.get(i) else {
                        return Err(SymbolicError::Parse("dangling backslash".into()));
                    };
                    i += 1;
                    toks.push(Tok::Cmd(sym.to_string()));
                } else {
                    toks.push(Tok::Cmd(chars[start..i].iter().collect()));
                }
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let run: String = chars[start..i].iter().collect();
                split_letter_run(&run, &mut toks);
            }
            _ => {
                i += 1;
                toks.push(match c {
                    '+' => Tok::Plus,
                    '-' | '−' => Tok::Minus,
                    '*' => {
                        if chars.get(i) == Some(&'*') {
                            i += 1;
                            Tok::Caret
                        } else {
                            Tok::Star
                        }
                    }
                    '×' | '·' => Tok::Star,
                    '/' | '÷' => Tok::Slash,
                    '^' => Tok::Caret,
                    '_' => Tok::Underscore,
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    '{' => Tok::LBrace,
                    '}' => Tok::RBrace,
                    '[' => Tok::LBracket,
                    ']' => Tok::RBracket,
                    '|' => Tok::Bar,
                    '!' => Tok::Bang,
                    '=' => Tok::Eq,
                    other => {
                        return Err(SymbolicError::Parse(format!(
                            "unexpected character {other:?} in {input:?}"
                        )))
                    }
                });
            }
        }
    }
    Ok(toks)
}

fn split_letter_run(run: &str, toks: &mut Vec<Tok>) {
    let mut rest = run;
    'outer: while !rest.is_empty() {
        for word in WORDS {
            if rest.starts_with(word) {
                toks.push(Tok::Word(word));
                rest = &rest[word.len()..];
                continue 'outer;
            }
        }
        let mut it = rest.chars();
        if let Some(c) = it.next() {
            toks.push(Tok::Letter(c));
        }
        rest = it.as_str();
    }
}

struct Parser<'a> {
    toks: Vec<Tok>,
    pos: usize,
    abs_depth: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), SymbolicError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SymbolicError>,
    ) -> Result<T, SymbolicError> {
        if self.depth >= MAX_DEPTH {
            return Err(SymbolicError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn error(&self, msg: String) -> SymbolicError {
        SymbolicError::Parse(format!("{msg} in {:?}", self.source))
    }

    /// Skips spacing commands and `\left`/`\right` markers.
    fn skip_noise(&mut self) {
        while let Some(Tok::Cmd(c)) = self.peek() {
            let noise = matches!(
                c.as_str(),
                "," | ";" | ":" | "!" | " " | "quad" | "qquad" | "left" | "right"
            );
            if !noise {
                return;
            }
            self.pos += 1;
        }
    }

    fn parse_relation(&mut self) -> Result<Parsed, SymbolicError> {
        let lhs = self.parse_sum()?;
        self.skip_noise();
        if self.eat(&Tok::Eq) {
            let rhs = self.parse_sum()?;
            self.skip_noise();
            self.finish()?;
            return Ok(Parsed::Equation(lhs, rhs));
        }
        self.finish()?;
        Ok(Parsed::Expr(lhs))
    }

    fn finish(&self) -> Result<(), SymbolicError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(self.error(format!("trailing token {tok:?}"))),
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        let mut terms = Vec::new();
        let first_negative = if self.eat(&Tok::Minus) {
            true
        } else {
            self.eat(&Tok::Plus);
            false
        };
        let first = self.parse_term()?;
        terms.push(if first_negative { first.neg() } else { first });
        loop {
            self.skip_noise();
            if self.eat(&Tok::Plus) {
                terms.push(self.parse_term()?);
            } else if self.eat(&Tok::Minus) {
                terms.push(self.parse_term()?.neg());
            } else {
                break;
            }
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Add(terms)
        })
    }

    /// Factors of a product stay in one flat `Mul` however long the chain.
    fn parse_term(&mut self) -> Result<Expr, SymbolicError> {
        let mut factors = vec![self.parse_signed_factor()?];
        loop {
            self.skip_noise();
            match self.peek().cloned() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    factors.push(self.parse_signed_factor()?);
                }
                Some(Tok::Cmd(c)) if c == "cdot" || c == "times" || c == "ast" => {
                    self.pos += 1;
                    factors.push(self.parse_signed_factor()?);
                }
                Some(Tok::Slash) => {
                    self.pos += 1;
                    factors.push(self.parse_signed_factor()?.pow(Expr::num(-1.0)));
                }
                Some(Tok::Cmd(c)) if c == "div" => {
                    self.pos += 1;
                    factors.push(self.parse_signed_factor()?.pow(Expr::num(-1.0)));
                }
                Some(tok) if self.starts_primary(&tok) => {
                    factors.push(self.parse_factor()?);
                }
                _ => break,
            }
        }
        Ok(if factors.len() == 1 {
            factors.remove(0)
        } else {
            Expr::Mul(factors)
        })
    }

    fn starts_primary(&self, tok: &Tok) -> bool {
        match tok {
            Tok::Num(_) | Tok::Letter(_) | Tok::Word(_) | Tok::LParen | Tok::LBrace => true,
            Tok::LBracket => true,
            Tok::Bar => self.abs_depth == 0,
            Tok::Cmd(c) => !matches!(
                c.as_str(),
                "cdot" | "times" | "ast" | "div" | "right" | "}" | ")" | "]"
            ),
            _ => false,
        }
    }

    fn parse_signed_factor(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        if self.eat(&Tok::Minus) {
            return self.nested(|p| Ok(p.parse_signed_factor()?.neg()));
        }
        if self.eat(&Tok::Plus) {
            return self.nested(Self::parse_signed_factor);
        }
        self.parse_factor()
    }

    fn parse_factor(&mut self) -> Result<Expr, SymbolicError> {
        let base = self.parse_postfix()?;
        self.skip_noise();
        if self.eat(&Tok::Caret) {
            let exponent = self.parse_exponent()?;
            return Ok(base.pow(exponent));
        }
        Ok(base)
    }

    fn parse_exponent(&mut self) -> Result<Expr, SymbolicError> {
        self.nested(Self::parse_exponent_inner)
    }

    fn parse_exponent_inner(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        match self.peek() {
            Some(Tok::LBrace) => self.parse_group(),
            Some(Tok::Minus) => {
                self.pos += 1;
                Ok(self.parse_exponent()?.neg())
            }
            // `x^23` in LaTeX means x^2 * 3; a bare digit run is one token here,
            // which matches plain-text `x^23`.
            _ => self.parse_factor(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, SymbolicError> {
        let mut e = self.parse_primary()?;
        let mut bangs = 0;
        while self.eat(&Tok::Bang) {
            bangs += 1;
            if self.depth + bangs > MAX_DEPTH {
                return Err(SymbolicError::TooDeep(MAX_DEPTH));
            }
            e = Expr::apply(Func::Factorial, e);
        }
        Ok(e)
    }

    fn parse_group(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        match self.next() {
            Some(Tok::LBrace) => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::RBrace)?;
                Ok(inner)
            }
            Some(Tok::LParen) => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::Num(n)) => Ok(Expr::num(n)),
            Some(Tok::Letter(c)) => Ok(Expr::sym(c.to_string())),
            Some(_) => {
                // Single-token argument such as `\frac\pi2`.
                self.pos -= 1;
                self.parse_primary()
            }
            None => Err(self.error("missing group".into())),
        }
    }

    /// Digits of a bare `\frac12` argument are consumed one at a time.
    fn parse_frac_arg(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        if let Some(Tok::Num(n)) = self.peek().cloned() {
            let text = format_plain(n);
            if text.len() > 1 && text.chars().all(|c| c.is_ascii_digit()) {
                let (head, tail) = text.split_at(1);
                let head_val: f64 = head.parse().unwrap_or(0.0);
                let tail_val: f64 = tail.parse().unwrap_or(0.0);
                self.toks[self.pos] = Tok::Num(tail_val);
                return Ok(Expr::num(head_val));
            }
        }
        self.parse_group()
    }

    fn parse_primary(&mut self) -> Result<Expr, SymbolicError> {
        self.nested(Self::parse_primary_inner)
    }

    fn parse_primary_inner(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        let tok = self
            .next()
            .ok_or_else(|| self.error("unexpected end of input".into()))?;
        match tok {
            Tok::Num(n) => Ok(Expr::num(n)),
            Tok::Letter(c) => self.parse_symbol_tail(c.to_string()),
            Tok::LParen => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::LBrace => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::RBrace)?;
                Ok(inner)
            }
            Tok::LBracket => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::RBracket)?;
                Ok(inner)
            }
            Tok::Bar => {
                self.abs_depth += 1;
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.abs_depth -= 1;
                self.expect(&Tok::Bar)?;
                Ok(Expr::apply(Func::Abs, inner))
            }
            Tok::Word("pi") => Ok(Expr::Const(Constant::Pi)),
            Tok::Word("sqrt") => self.parse_sqrt(),
            Tok::Word(w) => self.parse_function(w),
            Tok::Cmd(cmd) => self.parse_command(&cmd),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_symbol_tail(&mut self, mut name: String) -> Result<Expr, SymbolicError> {
        if self.eat(&Tok::Underscore) {
            let sub = match self.next() {
                Some(Tok::Num(n)) => format_plain(n),
                Some(Tok::Letter(c)) => c.to_string(),
                Some(Tok::LBrace) => {
                    let mut parts = String::new();
                    loop {
                        match self.next() {
                            Some(Tok::RBrace) => break,
                            Some(Tok::Num(n)) => parts.push_str(&format_plain(n)),
                            Some(Tok::Letter(c)) => parts.push(c),
                            Some(Tok::Word(w)) => parts.push_str(w),
                            Some(Tok::Cmd(c)) => parts.push_str(&c),
                            Some(other) => {
                                return Err(self.error(format!("unsupported subscript {other:?}")))
                            }
                            None => return Err(self.error("unclosed subscript".into())),
                        }
                    }
                    parts
                }
                other => return Err(self.error(format!("unsupported subscript {other:?}"))),
            };
            name = format!("{name}_{sub}");
        }
        Ok(Expr::Sym(name))
    }

    fn parse_sqrt(&mut self) -> Result<Expr, SymbolicError> {
        self.skip_noise();
        let index = if self.eat(&Tok::LBracket) {
            let idx = self.parse_sum()?;
            self.expect(&Tok::RBracket)?;
            idx
        } else {
            Expr::num(2.0)
        };
        let radicand = self.parse_group()?;
        Ok(radicand.pow(Expr::num(1.0).div(index)))
    }

    fn parse_function(&mut self, name: &str) -> Result<Expr, SymbolicError> {
        let func = Func::from_name(name)
            .ok_or_else(|| self.error(format!("unknown function {name}")))?;
        self.skip_noise();
        // `\log_{b}` changes the base.
        let base = if self.eat(&Tok::Underscore) {
            Some(self.parse_group()?)
        } else {
            None
        };
        // `\sin^2 x` raises the result.
        let power = if self.eat(&Tok::Caret) {
            Some(self.parse_exponent()?)
        } else {
            None
        };
        self.skip_noise();
        let arg = match self.peek() {
            Some(Tok::LParen) | Some(Tok::LBrace) => self.parse_group()?,
            _ => self.parse_factor()?,
        };
        let mut e = Expr::apply(func, arg);
        if let Some(b) = base {
            e = e.div(Expr::apply(Func::Ln, b));
        }
        if let Some(p) = power {
            e = e.pow(p);
        }
        Ok(e)
    }

    fn parse_command(&mut self, cmd: &str) -> Result<Expr, SymbolicError> {
        match cmd {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.parse_frac_arg()?;
                let den = self.parse_frac_arg()?;
                Ok(num.div(den))
            }
            "sqrt" => self.parse_sqrt(),
            "pi" => Ok(Expr::Const(Constant::Pi)),
            "{" => {
                let inner = self.parse_sum()?;
                self.skip_noise();
                self.expect(&Tok::Cmd("}".into()))?;
                Ok(inner)
            }
            "mathrm" | "mathbf" | "mathit" | "text" | "textbf" | "operatorname" | "boxed"
            | "displaystyle" => {
                if cmd == "displaystyle" {
                    return self.parse_primary();
                }
                self.parse_group()
            }
            "left" | "right" => self.parse_primary(),
            "arcsin" | "arccos" | "arctan" | "sin" | "cos" | "tan" | "sec" | "csc" | "cot"
            | "sinh" | "cosh" | "tanh" | "ln" | "log" | "exp" => {
                let word = WORDS
                    .iter()
                    .copied()
                    .find(|w| *w == cmd)
                    .ok_or_else(|| self.error(format!("unknown function {cmd}")))?;
                self.parse_function(word)
            }
            g if GREEK.contains(&g) => self.parse_symbol_tail(g.to_string()),
            other => Err(self.error(format!("unsupported command \\{other}"))),
        }
    }
}

fn format_plain(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Parses math text into an expression or a single equation.
pub fn parse(input: &str) -> Result<Parsed, SymbolicError> {
    let toks = tokenize(input)?;
    if toks.is_empty() {
        return Err(SymbolicError::Parse("empty input".into()));
    }
    let mut parser = Parser {
        toks,
        pos: 0,
        abs_depth: 0,
        depth: 0,
        source: input,
    };
    parser.parse_relation()
}

/// Parses math text that must be an expression (not an equation).
pub fn parse_expr(input: &str) -> Result<Expr, SymbolicError> {
    match parse(input)? {
        Parsed::Expr(e) => Ok(e),
        Parsed::Equation(..) => Err(SymbolicError::Parse(format!(
            "expected an expression, found an equation in {input:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::eval::evaluate_const;

    fn value(input: &str) -> f64 {
        evaluate_const(&parse_expr(input).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_arithmetic() {
        assert_eq!(value("1+2*3"), 7.0);
        assert_eq!(value("2^3^2"), 512.0);
        assert_eq!(value("2**3"), 8.0);
        assert_eq!(value("-3+5"), 2.0);
        assert_eq!(value("10/4"), 2.5);
    }

    #[test]
    fn test_latex_fractions_and_roots() {
        assert_eq!(value("\\frac{3}{4}"), 0.75);
        assert_eq!(value("\\dfrac{1}{2}"), 0.5);
        assert_eq!(value("\\frac12"), 0.5);
        assert_eq!(value("\\sqrt{16}"), 4.0);
        assert!((value("\\sqrt[3]{27}") - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_implicit_multiplication_and_constants() {
        assert!((value("2\\pi") - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(value("3\\times10^{8}"), 3e8);
        assert_eq!(value("2(3+4)"), 14.0);
        assert_eq!(value("\\left(1+1\\right)^2"), 4.0);
    }

    #[test]
    fn test_symbols_and_subscripts() {
        let e = parse_expr("x_1 + \\alpha y").unwrap();
        assert_eq!(
            e.free_symbols(),
            vec!["x_1".to_string(), "alpha".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_letter_runs_split_into_product() {
        let e = parse_expr("xy").unwrap();
        assert_eq!(e.free_symbols(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_functions() {
        assert!((value("\\sin{0}")).abs() < 1e-12);
        assert!((value("\\log_{2}{8}") - 3.0).abs() < 1e-12);
        assert_eq!(value("|-3|"), 3.0);
        assert_eq!(value("4!"), 24.0);
    }

    #[test]
    fn test_equation() {
        match parse("y = 2x + 1").unwrap() {
            Parsed::Equation(lhs, _) => assert_eq!(lhs, Expr::sym("y")),
            other => panic!("expected equation, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse("1,2").is_err());
        assert!(parse("").is_err());
        assert!(parse("\\frac{1}").is_err());
        assert!(parse("x = y = z").is_err());
        assert!(parse("\\infty").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = format!("{}x{}", "(".repeat(3000), ")".repeat(3000));
        assert_eq!(parse(&parens), Err(SymbolicError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(200_000));
        assert_eq!(parse(&signs), Err(SymbolicError::TooDeep(MAX_DEPTH)));

        let powers = vec!["2"; 5000].join("^");
        assert!(matches!(parse(&powers), Err(SymbolicError::TooDeep(_))));

        let bangs = format!("3{}", "!".repeat(5000));
        assert!(matches!(parse(&bangs), Err(SymbolicError::TooDeep(_))));

        // Shallow input well inside the limit still parses.
        let ok = format!("{}x{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse_expr(&ok).unwrap(), Expr::sym("x"));
    }

    #[test]
    fn test_long_products_stay_flat() {
        let product = vec!["x"; 50_000].join("*");
        match parse_expr(&product).unwrap() {
            Expr::Mul(factors) => assert_eq!(factors.len(), 50_000),
            other => panic!("expected a product, got {other:?}"),
        }
        assert_eq!(value("12/4/2"), 1.5);
    }
}
