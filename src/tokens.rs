use crate::error::EvalError;


#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Symbol(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) offset: usize,
}

// longest first, so that `//` wins over `/` and `**` over `*`
static SYMBOLS: [&str; 21] = [
    "**", "//", "==", "!=", "<=", ">=",
    "+", "-", "*", "/", "%", "<", ">",
    "(", ")", "[", "]", ",", ".", "=", "!",
];


pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let tail = &input[pos..];
        let c = match tail.chars().next() {
            Some(c) => c,
            None => break
        };
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }
        let (token, len) = if c.is_ascii_digit() {
            read_number(tail, pos)?
        } else if c == '_' || c.is_alphabetic() {
            read_name(tail)
        } else if c == '\'' || c == '"' {
            read_string(tail, c, pos)?
        } else if let Some(symbol) = SYMBOLS.iter().find(|s| tail.starts_with(**s)) {
            (Token::Symbol(*symbol), symbol.len())
        } else {
            return Err(EvalError::syntax(pos, format!("unexpected character '{}'", c)));
        };
        tokens.push(Spanned { token, offset: pos });
        pos += len;
    }
    Ok(tokens)
}

fn read_number(tail: &str, offset: usize) -> Result<(Token, usize), EvalError> {
    let bytes = tail.as_bytes();
    let digits = |from: usize| bytes[from..].iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let mut len = digits(0);
    let mut is_float = false;
    if bytes.get(len) == Some(&b'.') {
        is_float = true;
        len += 1 + digits(len + 1);
    }
    if matches!(bytes.get(len), Some(b'e') | Some(b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            is_float = true;
            len = exp + exp_digits;
        }
    }
    let text = &tail[..len];
    if is_float {
        text.parse::<f64>()
            .map(|x| (Token::Float(x), len))
            .map_err(|_| EvalError::syntax(offset, format!("invalid number '{}'", text)))
    } else {
        text.parse::<i64>()
            .map(|i| (Token::Int(i), len))
            .map_err(|_| EvalError::Overflow)
    }
}

fn read_name(tail: &str) -> (Token, usize) {
    let len = tail.char_indices()
        .find(|(_, c)| !(*c == '_' || c.is_alphanumeric()))
        .map_or(tail.len(), |(i, _)| i);
    (Token::Name(tail[..len].to_owned()), len)
}

fn read_string(tail: &str, quote: char, offset: usize) -> Result<(Token, usize), EvalError> {
    let mut text = String::new();
    let mut chars = tail.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, 'r')) => text.push('\r'),
                Some((_, '0')) => text.push('\0'),
                Some((_, c)) if c == '\\' || c == '\'' || c == '"' => text.push(c),
                // unknown escapes are kept verbatim
                Some((_, c)) => {
                    text.push('\\');
                    text.push(c);
                },
                None => break
            },
            c if c == quote => return Ok((Token::Str(text), i + 1)),
            c => text.push(c)
        }
    }
    Err(EvalError::syntax(offset, "unterminated string literal"))
}
