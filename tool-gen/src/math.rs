//! Exact arithmetic for the calculator and equation tools.
//!
//! Expressions are parsed into single-variable polynomials, which covers
//! plain arithmetic as well as linear and quadratic equations:
//!
//! ```text
//! "x^2 + 5x + 6 = 0"  ->  [6, 5, 1]  ->  x = -3, x = -2
//! "2 * (3 + 4)"       ->  [14]       ->  14
//! ```

use std::fmt;

use thiserror::Error;

/// Highest exponent accepted on a variable.
const MAX_EXPONENT: u32 = 8;

/// Highest degree any intermediate polynomial may reach.
const MAX_DEGREE: usize = 8;

/// Deepest nesting of parentheses and signs the parser follows.
const MAX_DEPTH: usize = 64;

const EPSILON: f64 = 1e-9;

/// Errors from parsing or solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot divide by an expression containing {0}")]
    VariableDivisor(char),

    #[error("exponent must be a whole number between 0 and {MAX_EXPONENT}")]
    InvalidExponent,

    #[error("expected one variable, found {0} and {1}")]
    TooManyVariables(char, char),

    #[error("expression contains the variable {0}; solve it as an equation")]
    NotConstant(char),

    #[error("equation must contain exactly one '='")]
    MalformedEquation,

    #[error("only equations up to degree 2 are supported (got degree {0})")]
    DegreeTooHigh(usize),

    #[error("expression is nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    #[error("equation has no variable")]
    NoVariable,

    #[error("result is not a finite number")]
    NotFinite,
}

/// Result type for math operations.
pub type MathResult<T> = std::result::Result<T, MathError>;

/// What a solved equation says about its variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    /// Real roots in ascending order.
    Roots { variable: char, roots: Vec<f64> },

    /// A conjugate pair `re ± im·i`.
    Complex { variable: char, re: f64, im: f64 },

    /// Every value satisfies the equation.
    Identity { variable: char },

    /// No value satisfies the equation.
    NoSolution { variable: char },
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roots { variable, roots } => {
                let parts: Vec<String> = roots
                    .iter()
                    .map(|r| format!("{variable} = {}", format_number(*r)))
                    .collect();
                write!(f, "{}", parts.join(", "))
            }
            Self::Complex { variable, re, im } => write!(
                f,
                "{variable} = {} ± {}i",
                format_number(*re),
                format_number(*im)
            ),
            Self::Identity { variable } => write!(f, "every value of {variable} is a solution"),
            Self::NoSolution { variable } => write!(f, "no value of {variable} is a solution"),
        }
    }
}

/// Kind of math found in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Arithmetic to evaluate.
    Expression,

    /// An equation (or expression in a variable) to solve.
    Equation,
}

/// A math fragment located in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathProblem {
    /// The fragment, normalized.
    pub source: String,

    /// Whether to evaluate or solve it.
    pub kind: ProblemKind,
}

/// Evaluate a constant expression.
pub fn evaluate(expression: &str) -> MathResult<f64> {
    let (poly, variable) = parse_polynomial(expression)?;
    if let Some(v) = variable {
        if poly.degree() > 0 {
            return Err(MathError::NotConstant(v));
        }
    }

    let value = poly.coefficient(0);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MathError::NotFinite)
    }
}

/// Solve an equation in one variable.
///
/// Input without `=` is treated as `expression = 0`.
pub fn solve(equation: &str) -> MathResult<Solution> {
    let mut sides = equation.split('=');
    let lhs = sides.next().unwrap_or_default();
    let rhs = sides.next();
    if sides.next().is_some() {
        return Err(MathError::MalformedEquation);
    }

    let (left, left_var) = parse_polynomial(lhs)?;
    let (right, right_var) = match rhs {
        Some(rhs) => parse_polynomial(rhs)?,
        None => (Polynomial::constant(0.0), None),
    };

    let variable = match (left_var, right_var) {
        (Some(a), Some(b)) if a != b => return Err(MathError::TooManyVariables(a, b)),
        (Some(v), _) | (None, Some(v)) => v,
        (None, None) => return Err(MathError::NoVariable),
    };

    let poly = left.sub(&right);
    match poly.degree() {
        0 => {
            if poly.coefficient(0).abs() < EPSILON {
                Ok(Solution::Identity { variable })
            } else {
                Ok(Solution::NoSolution { variable })
            }
        }
        1 => {
            let root = -poly.coefficient(0) / poly.coefficient(1);
            Ok(Solution::Roots {
                variable,
                roots: vec![clean(root)],
            })
        }
        2 => Ok(solve_quadratic(
            variable,
            poly.coefficient(2),
            poly.coefficient(1),
            poly.coefficient(0),
        )),
        degree => Err(MathError::DegreeTooHigh(degree)),
    }
}

fn solve_quadratic(variable: char, a: f64, b: f64, c: f64) -> Solution {
    let discriminant = b * b - 4.0 * a * c;
    let vertex = -b / (2.0 * a);

    if discriminant.abs() < EPSILON {
        Solution::Roots {
            variable,
            roots: vec![clean(vertex)],
        }
    } else if discriminant > 0.0 {
        let offset = discriminant.sqrt() / (2.0 * a).abs();
        Solution::Roots {
            variable,
            roots: vec![clean(vertex - offset), clean(vertex + offset)],
        }
    } else {
        Solution::Complex {
            variable,
            re: clean(vertex),
            im: clean((-discriminant).sqrt() / (2.0 * a).abs()),
        }
    }
}

/// Render a number without a trailing `.0`, rounding away float noise.
pub fn format_number(value: f64) -> String {
    let value = clean(value);
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }

    let rendered = format!("{value:.6}");
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn clean(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < EPSILON {
        // Avoid printing "-0".
        if rounded == 0.0 { 0.0 } else { rounded }
    } else {
        value
    }
}

/// Find the longest parseable math fragment in `text`.
pub fn find_problem(text: &str) -> Option<MathProblem> {
    let mut runs: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for word in text.split_whitespace() {
        match math_word(word) {
            Some(w) => current.push(w),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    let mut candidates: Vec<String> = runs
        .into_iter()
        .map(|run| run.join(" "))
        .filter(|s| s.chars().any(|c| c.is_ascii_digit()) && s.contains(is_operator))
        .collect();
    candidates.sort_by_key(|s| std::cmp::Reverse(s.len()));

    candidates.into_iter().find_map(|source| {
        let has_variable = source.chars().any(|c| c.is_ascii_alphabetic());
        if source.contains('=') || has_variable {
            solve(&source).ok().map(|_| MathProblem {
                source,
                kind: ProblemKind::Equation,
            })
        } else {
            evaluate(&source).ok().map(|_| MathProblem {
                source,
                kind: ProblemKind::Expression,
            })
        }
    })
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '^' | '=')
}

/// Normalize a whitespace-separated word if it can be part of a formula.
fn math_word(word: &str) -> Option<String> {
    let word = word
        .trim_start_matches(['"', '\'', '`'])
        .trim_end_matches(['?', '!', ',', ';', ':', '.', '"', '\'', '`']);
    if word.is_empty() {
        return None;
    }

    let normalized: String = word
        .chars()
        .map(|c| match c {
            '×' => '*',
            '÷' => '/',
            '−' => '-',
            other => other,
        })
        .collect();

    let allowed = normalized.chars().all(|c| {
        c.is_ascii_digit() || c.is_ascii_alphabetic() || "+-*/^().=".contains(c)
    });
    let letters_apart = !normalized
        .as_bytes()
        .windows(2)
        .any(|w| w[0].is_ascii_alphabetic() && w[1].is_ascii_alphabetic());
    // A lone letter is an article or pronoun far more often than a formula.
    let lone_letter = normalized.len() == 1 && normalized.chars().all(|c| c.is_ascii_alphabetic());

    (allowed && letters_apart && !lone_letter).then_some(normalized)
}

/// Coefficients in ascending order of power, with trailing zeros trimmed.
#[derive(Debug, Clone, PartialEq)]
struct Polynomial(Vec<f64>);

impl Polynomial {
    fn constant(value: f64) -> Self {
        Self(vec![value]).trimmed()
    }

    fn variable() -> Self {
        Self(vec![0.0, 1.0])
    }

    fn trimmed(mut self) -> Self {
        while self.0.len() > 1 && self.0.last().is_some_and(|c| c.abs() < EPSILON) {
            self.0.pop();
        }
        if self.0.is_empty() {
            self.0.push(0.0);
        }
        self
    }

    fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    fn coefficient(&self, power: usize) -> f64 {
        self.0.get(power).copied().unwrap_or(0.0)
    }

    fn as_constant(&self) -> Option<f64> {
        (self.degree() == 0).then(|| self.coefficient(0))
    }

    fn add(&self, other: &Self) -> Self {
        let len = self.0.len().max(other.0.len());
        Self(
            (0..len)
                .map(|i| self.coefficient(i) + other.coefficient(i))
                .collect(),
        )
        .trimmed()
    }

    fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(-1.0))
    }

    fn scale(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|c| c * factor).collect()).trimmed()
    }

    fn mul(&self, other: &Self) -> MathResult<Self> {
        let degree = self.degree() + other.degree();
        if degree > MAX_DEGREE {
            return Err(MathError::DegreeTooHigh(degree));
        }
        let mut out = vec![0.0; self.0.len() + other.0.len() - 1];
        for (i, a) in self.0.iter().enumerate() {
            for (j, b) in other.0.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Ok(Self(out).trimmed())
    }

    fn pow(&self, exponent: u32) -> MathResult<Self> {
        let degree = self.degree().saturating_mul(exponent as usize);
        if degree > MAX_DEGREE {
            return Err(MathError::DegreeTooHigh(degree));
        }
        (0..exponent).try_fold(Self::constant(1.0), |acc, _| acc.mul(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Var(char),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Num(n) => format!("number {}", format_number(*n)),
            Self::Var(v) => format!("variable {v}"),
            Self::Plus => "'+'".to_string(),
            Self::Minus => "'-'".to_string(),
            Self::Star => "'*'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Caret => "'^'".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> MathResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {}
            '0'..='9' | '.' => {
                let start = i;
                while i + 1 < chars.len() && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.')
                {
                    i += 1;
                }
                let literal: String = chars[start..=i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| MathError::UnexpectedToken(format!("number '{literal}'")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                if chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic()) {
                    let word: String = chars[i..]
                        .iter()
                        .take_while(|c| c.is_ascii_alphabetic())
                        .collect();
                    return Err(MathError::UnexpectedToken(format!("word '{word}'")));
                }
                tokens.push(Token::Var(c.to_ascii_lowercase()));
            }
            '+' => tokens.push(Token::Plus),
            '-' | '−' => tokens.push(Token::Minus),
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                tokens.push(Token::Caret);
            }
            '*' | '×' => tokens.push(Token::Star),
            '/' | '÷' => tokens.push(Token::Slash),
            '^' => tokens.push(Token::Caret),
            '(' | '[' => tokens.push(Token::LParen),
            ')' | ']' => tokens.push(Token::RParen),
            other => return Err(MathError::UnexpectedChar(other)),
        }
        i += 1;
    }

    Ok(tokens)
}

fn parse_polynomial(input: &str) -> MathResult<(Polynomial, Option<char>)> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(MathError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        variable: None,
    };
    let poly = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(MathError::UnexpectedToken(token.describe()));
    }

    Ok((poly, parser.variable))
}

/// Recursive-descent parser.
///
/// ```text
/// expression := term (('+' | '-') term)*
/// term       := unary (('*' | '/') unary | implicit)*
/// unary      := '-' unary | '+' unary | power
/// power      := primary ('^' unary)?
/// primary    := number | variable | '(' expression ')'
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    variable: Option<char>,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> MathResult<Token> {
        let token = self.peek().ok_or(MathError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expression(&mut self) -> MathResult<Polynomial> {
        let mut acc = self.term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.pos += 1;
                    acc = acc.add(&self.term()?);
                }
                Token::Minus => {
                    self.pos += 1;
                    acc = acc.sub(&self.term()?);
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> MathResult<Polynomial> {
        let mut acc = self.unary()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.pos += 1;
                    acc = acc.mul(&self.unary()?)?;
                }
                Token::Slash => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    let Some(value) = divisor.as_constant() else {
                        return Err(MathError::VariableDivisor(self.variable.unwrap_or('x')));
                    };
                    if value.abs() < f64::EPSILON {
                        return Err(MathError::DivisionByZero);
                    }
                    acc = acc.scale(1.0 / value);
                }
                // Implicit multiplication: "2x", "3(x + 1)", "(x + 1)(x - 1)".
                Token::Var(_) | Token::LParen => {
                    acc = acc.mul(&self.power()?)?;
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    /// Every nested parenthesis and sign passes through here.
    fn unary(&mut self) -> MathResult<Polynomial> {
        if self.depth >= MAX_DEPTH {
            return Err(MathError::TooDeep);
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> MathResult<Polynomial> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(self.unary()?.scale(-1.0))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> MathResult<Polynomial> {
        let base = self.primary()?;
        if self.peek() != Some(Token::Caret) {
            return Ok(base);
        }
        self.pos += 1;

        let exponent = self
            .unary()?
            .as_constant()
            .ok_or(MathError::InvalidExponent)?;

        if let Some(value) = base.as_constant() {
            return Ok(Polynomial::constant(value.powf(exponent)));
        }

        let whole = exponent.round();
        if (exponent - whole).abs() > EPSILON || whole < 0.0 || whole > f64::from(MAX_EXPONENT) {
            return Err(MathError::InvalidExponent);
        }
        base.pow(whole as u32)
    }

    fn primary(&mut self) -> MathResult<Polynomial> {
        match self.next()? {
            Token::Num(value) => Ok(Polynomial::constant(value)),
            Token::Var(name) => {
                match self.variable {
                    Some(existing) if existing != name => {
                        return Err(MathError::TooManyVariables(existing, name));
                    }
                    _ => self.variable = Some(name),
                }
                Ok(Polynomial::variable())
            }
            Token::LParen => {
                let inner = self.expression()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(MathError::UnexpectedToken(other.describe())),
                }
            }
            other => Err(MathError::UnexpectedToken(other.describe())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2^10").unwrap(), 1024.0);
        assert_eq!(evaluate("-3^2").unwrap(), -9.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(evaluate("1 / 0"), Err(MathError::DivisionByZero));
        assert_eq!(evaluate(""), Err(MathError::Empty));
        assert!(matches!(evaluate("2 +"), Err(MathError::UnexpectedEnd)));
        assert!(matches!(evaluate("2x + 1"), Err(MathError::NotConstant('x'))));
    }

    #[test]
    fn test_solve_quadratic() {
        let solution = solve("x^2 + 5x + 6 = 0").unwrap();
        assert_eq!(solution.to_string(), "x = -3, x = -2");
    }

    #[test]
    fn test_solve_linear_with_variable_on_both_sides() {
        let solution = solve("3x + 2 = x - 4").unwrap();
        assert_eq!(solution.to_string(), "x = -3");
    }

    #[test]
    fn test_solve_double_root_and_complex() {
        assert_eq!(solve("x^2 - 4x + 4 = 0").unwrap().to_string(), "x = 2");
        assert_eq!(solve("x^2 + 1 = 0").unwrap().to_string(), "x = 0 ± 1i");
    }

    #[test]
    fn test_solve_expression_without_equals() {
        assert_eq!(solve("(y - 1)(y + 2)").unwrap().to_string(), "y = -2, y = 1");
    }

    #[test]
    fn test_solve_degenerate_cases() {
        assert_eq!(
            solve("x + 1 = x + 1").unwrap(),
            Solution::Identity { variable: 'x' }
        );
        assert_eq!(
            solve("x + 1 = x + 2").unwrap(),
            Solution::NoSolution { variable: 'x' }
        );
        assert_eq!(solve("x^3 = 1"), Err(MathError::DegreeTooHigh(3)));
        assert_eq!(solve("x + y = 1"), Err(MathError::TooManyVariables('x', 'y')));
        assert_eq!(solve("1 = 1"), Err(MathError::NoVariable));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let nested = format!("{}1+1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&nested), Err(MathError::TooDeep));
        assert_eq!(evaluate(&"-".repeat(10_000)), Err(MathError::TooDeep));
        assert_eq!(find_problem(&format!("What is {nested}?")), None);

        let shallow = format!("{}1+1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&shallow).unwrap(), 2.0);
    }

    #[test]
    fn test_nested_powers_stop_at_degree_limit() {
        assert_eq!(
            solve("(((((x^8)^8)^8)^8)^8) = 0"),
            Err(MathError::DegreeTooHigh(64))
        );
        assert_eq!(solve("x^8 * x = 0"), Err(MathError::DegreeTooHigh(9)));
        assert_eq!(solve("(x^4)^2 = 1"), Err(MathError::DegreeTooHigh(8)));
        assert_eq!(
            find_problem("Solve (((((x^8)^8)^8)^8)^8) = 0 quickly"),
            None
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(2.000_000_000_1), "2");
    }

    #[test]
    fn test_find_problem_in_sentence() {
        let problem = find_problem("Solve x^2 + 5x + 6 = 0").unwrap();
        assert_eq!(problem.source, "x^2 + 5x + 6 = 0");
        assert_eq!(problem.kind, ProblemKind::Equation);

        let problem = find_problem("What is 12 * (3 + 4)?").unwrap();
        assert_eq!(problem.source, "12 * (3 + 4)");
        assert_eq!(problem.kind, ProblemKind::Expression);
    }

    #[test]
    fn test_find_problem_ignores_plain_text() {
        assert_eq!(find_problem("Translate 'Hello' to Spanish"), None);
        assert_eq!(find_problem("I have 3 cats"), None);
    }
}
