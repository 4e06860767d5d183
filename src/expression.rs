//! Expression evaluation over a restricted namespace.
//!
//! Expressions are a small, Python-flavoured grammar of literals, names,
//! arithmetic, comparisons, boolean connectives, list literals and indexing.
//! Names resolve only against the supplied [Namespace]; there are no builtins
//! and values are plain data, so function calls and attribute access are
//! rejected outright.
//!
//! ```
//! use framelet::{evaluate, Context, Value};
//!
//! let context = Context::new().with("temperature", 20);
//! assert_eq!(
//!     evaluate("temperature > 15 and temperature <= 30", &context),
//!     Ok(Value::Bool(true))
//! );
//! assert!(evaluate("open('/etc/passwd')", &context).is_err());
//! ```
use std::cmp::Ordering;
use crate::context::Namespace;
use crate::error::EvalError;
use crate::tokens::{tokenize, Spanned, Token};
use crate::value::Value;


/// Outcome of evaluating an expression.
pub type Evaluation = Result<Value, EvalError>;

/// Longest string (in bytes) or list an expression may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Deepest operator nesting the parser accepts.
pub const MAX_EXPRESSION_DEPTH: usize = 100;


/// Parses and evaluates `source` against `namespace`.
pub fn evaluate(source: &str, namespace: &dyn Namespace) -> Evaluation {
    Expression::parse(source).evaluate(namespace)
}


/// An expression parsed once and evaluated any number of times.
///
/// Parsing never fails outright: a malformed source is kept along with its
/// syntax error, which is returned by every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    parsed: Result<Expr, EvalError>,
}

impl Expression {
    pub fn parse(source: &str) -> Self {
        let parsed = tokenize(source)
            .and_then(|tokens| Parser::new(tokens, source.len()).parse());
        Expression {
            source: source.to_owned(),
            parsed,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.parsed.is_ok()
    }

    pub fn evaluate(&self, namespace: &dyn Namespace) -> Evaluation {
        match &self.parsed {
            Ok(expr) => eval(expr, namespace),
            Err(err) => Err(err.clone())
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
}


// `depth` counts both bracketed nesting and operator chains, since either
// one deepens the tree that evaluation later recurses through.
struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Parser { tokens, pos: 0, end, depth: 0 }
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        if self.tokens.is_empty() {
            return Err(EvalError::syntax(0, "empty expression"));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(self.unexpected(token))
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|it| &it.token)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|it| &it.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |it| it.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|it| it.token.clone());
        self.pos += 1;
        token
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == symbol) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<(), EvalError> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(EvalError::syntax(self.offset(), format!("expected '{}'", symbol)))
        }
    }

    fn unexpected(&self, token: &Token) -> EvalError {
        EvalError::syntax(self.offset(), format!("unexpected {:?}", token))
    }

    fn deeper(&mut self) -> Result<(), EvalError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(EvalError::syntax(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn nested(
        &mut self, parse: fn(&mut Self) -> Result<Expr, EvalError>
    ) -> Result<Expr, EvalError> {
        let depth = self.depth;
        self.deeper()?;
        let expr = parse(self)?;
        self.depth = depth;
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            self.deeper()?;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            self.deeper()?;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.eat_keyword("not") {
            let operand = self.nested(Self::parse_not)?;
            Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op() {
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let (op, width) = match self.peek()? {
            Token::Symbol("==") => (CompareOp::Eq, 1),
            Token::Symbol("!=") => (CompareOp::NotEq, 1),
            Token::Symbol("<") => (CompareOp::Lt, 1),
            Token::Symbol("<=") => (CompareOp::LtEq, 1),
            Token::Symbol(">") => (CompareOp::Gt, 1),
            Token::Symbol(">=") => (CompareOp::GtEq, 1),
            Token::Name(name) if name == "in" => (CompareOp::In, 1),
            Token::Name(name) if name == "not"
                && matches!(self.peek_second(), Some(Token::Name(next)) if next == "in") => {
                (CompareOp::NotIn, 2)
            },
            _ => return None
        };
        self.pos += width;
        Some(op)
    }

    fn parse_sum(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinaryOp::Add
            } else if self.eat_symbol("-") {
                BinaryOp::Sub
            } else {
                self.depth = depth;
                return Ok(left);
            };
            self.deeper()?;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinaryOp::Mul
            } else if self.eat_symbol("//") {
                BinaryOp::FloorDiv
            } else if self.eat_symbol("/") {
                BinaryOp::Div
            } else if self.eat_symbol("%") {
                BinaryOp::Mod
            } else {
                self.depth = depth;
                return Ok(left);
            };
            self.deeper()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        if self.eat_symbol("-") {
            Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.nested(Self::parse_unary)?)))
        } else if self.eat_symbol("+") {
            Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.nested(Self::parse_unary)?)))
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_postfix()?;
        if self.eat_symbol("**") {
            // right associative, and binds tighter than a unary minus on its left
            let exponent = self.nested(Self::parse_unary)?;
            Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
        } else {
            Ok(base)
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let depth = self.depth;
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_symbol("[") {
                self.deeper()?;
                let index = self.parse_or()?;
                self.expect_symbol("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if matches!(self.peek(), Some(Token::Symbol("("))) {
                return Err(EvalError::Forbidden("function call"));
            } else if matches!(self.peek(), Some(Token::Symbol("."))) {
                return Err(EvalError::Forbidden("attribute access"));
            } else {
                self.depth = depth;
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(x)) => Ok(Expr::Literal(Value::Float(x))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::Name(name)) => match name.as_str() {
                "True" => Ok(Expr::Literal(Value::Bool(true))),
                "False" => Ok(Expr::Literal(Value::Bool(false))),
                "None" => Ok(Expr::Literal(Value::None)),
                "and" | "or" | "not" | "in" => Err(
                    EvalError::syntax(offset, format!("unexpected keyword '{}'", name))
                ),
                _ => Ok(Expr::Name(name))
            },
            Some(Token::Symbol("(")) => {
                let expr = self.nested(Self::parse_or)?;
                self.expect_symbol(")")?;
                Ok(expr)
            },
            Some(Token::Symbol("[")) => {
                let mut items = Vec::new();
                while !self.eat_symbol("]") {
                    items.push(self.nested(Self::parse_or)?);
                    if !self.eat_symbol(",") {
                        self.expect_symbol("]")?;
                        break;
                    }
                }
                Ok(Expr::List(items))
            },
            Some(Token::Symbol(s)) => Err(
                EvalError::syntax(offset, format!("unexpected '{}'", s))
            ),
            None => Err(EvalError::syntax(offset, "unexpected end of expression"))
        }
    }
}


fn eval(expr: &Expr, namespace: &dyn Namespace) -> Evaluation {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => namespace.lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownName(name.to_owned())),
        Expr::List(items) => items.iter()
            .map(|item| eval(item, namespace))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Expr::Index(target, index) => {
            let target = eval(target, namespace)?;
            let index = eval(index, namespace)?;
            subscript(&target, &index)
        },
        Expr::Unary(op, operand) => unary(*op, eval(operand, namespace)?),
        Expr::Binary(op, left, right) => {
            let left = eval(left, namespace)?;
            let right = eval(right, namespace)?;
            binary(*op, &left, &right)
        },
        Expr::And(left, right) => {
            let left = eval(left, namespace)?;
            if left.is_truthy() { eval(right, namespace) } else { Ok(left) }
        },
        Expr::Or(left, right) => {
            let left = eval(left, namespace)?;
            if left.is_truthy() { Ok(left) } else { eval(right, namespace) }
        },
        Expr::Compare(first, rest) => {
            let mut left = eval(first, namespace)?;
            for (op, right) in rest {
                let right = eval(right, namespace)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
    }
}


#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(x) => x,
        }
    }
}

fn unsupported(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op, left.type_name(), right.type_name()
    ))
}

fn unary(op: UnaryOp, operand: Value) -> Evaluation {
    match (op, Number::of(&operand)) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Some(Number::Int(i))) => i.checked_neg()
            .map(Value::Int)
            .ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Some(Number::Float(x))) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Number::Float(x))) => Ok(Value::Float(x)),
        (_, None) => Err(EvalError::type_error(format!(
            "bad operand type for unary operator: '{}'", operand.type_name()
        )))
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Evaluation {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            bounded(a.len().checked_add(b.len()))?;
            Ok(Value::Str(format!("{}{}", a, b)))
        },
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            bounded(a.len().checked_add(b.len()))?;
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        },
        (BinaryOp::Mul, Value::Str(_), _) | (BinaryOp::Mul, Value::List(_), _) => repeat(left, right),
        (BinaryOp::Mul, _, Value::Str(_)) | (BinaryOp::Mul, _, Value::List(_)) => repeat(right, left),
        _ => match (Number::of(left), Number::of(right)) {
            (Some(a), Some(b)) => arithmetic(op, a, b),
            _ => Err(unsupported(symbol(op), left, right))
        }
    }
}

fn symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
    }
}

fn repeat(sequence: &Value, count: &Value) -> Evaluation {
    let count = match count {
        Value::Int(i) => *i,
        Value::Bool(b) => *b as i64,
        _ => return Err(unsupported("*", sequence, count))
    };
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::Str(s) => {
            let count = if s.is_empty() { 0 } else { count };
            bounded(s.len().checked_mul(count))?;
            Ok(Value::Str(s.repeat(count)))
        },
        Value::List(items) => {
            let count = if items.is_empty() { 0 } else { count };
            bounded(items.len().checked_mul(count))?;
            Ok(Value::List(
                (0..count).flat_map(|_| items.iter().cloned()).collect()
            ))
        },
        _ => Err(unsupported("*", sequence, &Value::Int(count as i64)))
    }
}

fn bounded(len: Option<usize>) -> Result<usize, EvalError> {
    len.filter(|len| *len <= MAX_SEQUENCE_LEN)
        .ok_or(EvalError::TooLarge { limit: MAX_SEQUENCE_LEN })
}

fn arithmetic(op: BinaryOp, a: Number, b: Number) -> Evaluation {
    use Number::{Int, Float};
    let result = match (op, a, b) {
        (BinaryOp::Add, Int(a), Int(b)) => Int(a.checked_add(b).ok_or(EvalError::Overflow)?),
        (BinaryOp::Sub, Int(a), Int(b)) => Int(a.checked_sub(b).ok_or(EvalError::Overflow)?),
        (BinaryOp::Mul, Int(a), Int(b)) => Int(a.checked_mul(b).ok_or(EvalError::Overflow)?),
        (BinaryOp::FloorDiv, Int(_), Int(0)) | (BinaryOp::Mod, Int(_), Int(0)) => {
            return Err(EvalError::DivisionByZero)
        },
        (BinaryOp::FloorDiv, Int(a), Int(b)) => {
            let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
            Int(if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q })
        },
        (BinaryOp::Mod, Int(a), Int(b)) => {
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
        },
        (BinaryOp::Pow, Int(a), Int(b)) if b >= 0 => {
            let exp = u32::try_from(b).map_err(|_| EvalError::Overflow)?;
            Int(a.checked_pow(exp).ok_or(EvalError::Overflow)?)
        },
        (BinaryOp::Pow, Int(0), Int(_)) => return Err(EvalError::DivisionByZero),
        (op, a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            match op {
                BinaryOp::Add => Float(x + y),
                BinaryOp::Sub => Float(x - y),
                BinaryOp::Mul => Float(x * y),
                BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if y == 0.0 => {
                    return Err(EvalError::DivisionByZero)
                },
                BinaryOp::Div => Float(x / y),
                BinaryOp::FloorDiv => Float((x / y).floor()),
                BinaryOp::Mod => Float(x - y * (x / y).floor()),
                BinaryOp::Pow if x == 0.0 && y < 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Pow => Float(x.powf(y)),
            }
        }
    };
    Ok(match result {
        Int(i) => Value::Int(i),
        Float(x) => Value::Float(x),
    })
}

fn equals(left: &Value, right: &Value) -> bool {
    match (Number::of(left), Number::of(right)) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => match (left, right) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
            },
            _ => false
        }
    }
}

fn order(op: &str, left: &Value, right: &Value) -> Result<Option<Ordering>, EvalError> {
    match (Number::of(left), Number::of(right)) {
        (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(Some(a.cmp(&b))),
        (Some(a), Some(b)) => Ok(a.as_f64().partial_cmp(&b.as_f64())),
        _ => match (left, right) {
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    if !equals(x, y) {
                        return order(op, x, y);
                    }
                }
                Ok(Some(a.len().cmp(&b.len())))
            },
            _ => Err(EvalError::type_error(format!(
                "'{}' not supported between '{}' and '{}'",
                op, left.type_name(), right.type_name()
            )))
        }
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match (container, item) {
        (Value::List(items), _) => Ok(items.iter().any(|it| equals(it, item))),
        (Value::Str(text), Value::Str(needle)) => Ok(text.contains(needle.as_str())),
        (Value::Str(_), _) => Err(EvalError::type_error(format!(
            "'in <str>' requires str as left operand, not '{}'", item.type_name()
        ))),
        _ => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable", container.type_name()
        )))
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CompareOp::Eq => equals(left, right),
        CompareOp::NotEq => !equals(left, right),
        CompareOp::Lt => order("<", left, right)? == Some(Ordering::Less),
        CompareOp::LtEq => matches!(order("<=", left, right)?, Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => order(">", left, right)? == Some(Ordering::Greater),
        CompareOp::GtEq => matches!(order(">=", left, right)?, Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    })
}

fn subscript(target: &Value, index: &Value) -> Evaluation {
    let i = match index {
        Value::Int(i) => *i,
        Value::Bool(b) => *b as i64,
        _ => return Err(EvalError::type_error(format!(
            "indices must be integers, not '{}'", index.type_name()
        )))
    };
    let resolve = |len: usize| {
        let position = if i < 0 { i + len as i64 } else { i };
        if position < 0 || position >= len as i64 {
            Err(EvalError::IndexOutOfRange { index: i, len })
        } else {
            Ok(position as usize)
        }
    };
    match target {
        Value::List(items) => Ok(items[resolve(items.len())?].clone()),
        Value::Str(text) => {
            let len = text.chars().count();
            let position = resolve(len)?;
            Ok(text.chars()
                .nth(position)
                .map(String::from)
                .map_or(Value::None, Value::Str))
        },
        _ => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable", target.type_name()
        )))
    }
}
