static VALUE_OPEN: &str = "{{";
static VALUE_CLOSE: &str = "}}";
static TAG_OPEN: &str = "{%";
static TAG_CLOSE: &str = "%}";


#[derive(Clone)]
pub(crate) struct Reader<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Reader {
            input,
            pos: 0,
            token_start: 0,
        }
    }

    /// Byte offset where the last returned token starts.
    pub(crate) fn token_start(&self) -> usize {
        self.token_start
    }

    /// Source text of the last returned token, delimiters included.
    pub(crate) fn token_text(&self) -> &'a str {
        &self.input[self.token_start..self.pos]
    }

    pub(crate) fn pop_front(&mut self) -> Option<Token<'a>> {
        if self.pos == self.input.len() {
            None
        } else {
            self.token_start = self.pos;
            let tail = &self.input[self.pos..];
            let token = if tail.starts_with(VALUE_OPEN) {
                self.read_value(tail)
            } else if tail.starts_with(TAG_OPEN) {
                self.read_tag(tail)
            } else {
                self.read_text(tail)
            };
            Some(token)
        }
    }

    fn read_text(&mut self, tail: &'a str) -> Token<'a> {
        let after_text = tail.span_text();
        self.pos += after_text;
        Token::Text(&tail[..after_text])
    }

    fn read_value(&mut self, tail: &'a str) -> Token<'a> {
        match tail.span_delimited(VALUE_OPEN, VALUE_CLOSE) {
            Some((text, after)) => {
                self.pos += after;
                Token::Value(text)
            },
            None => self.read_open_delimiter(tail, VALUE_OPEN)
        }
    }

    fn read_tag(&mut self, tail: &'a str) -> Token<'a> {
        match tail.span_delimited(TAG_OPEN, TAG_CLOSE) {
            Some((text, after)) => {
                self.pos += after;
                Token::tag(text).unwrap_or(Token::Text(&tail[..after]))
            },
            None => self.read_open_delimiter(tail, TAG_OPEN)
        }
    }

    // an unterminated directive opener is plain text
    fn read_open_delimiter(&mut self, tail: &'a str, delimiter: &str) -> Token<'a> {
        self.pos += delimiter.len();
        Token::Text(&tail[..delimiter.len()])
    }
}


#[derive(PartialEq, Debug)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    Value(&'a str),
    If(&'a str),
    Elif(&'a str),
    Else,
    EndIf,
    For(&'a str, &'a str),
    EndFor,
}

impl<'a> Token<'a> {
    // None for anything that is not a well formed directive
    fn tag(text: &'a str) -> Option<Token<'a>> {
        let (keyword, rest) = match text.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (text, "")
        };
        match (keyword, rest.is_empty()) {
            ("if", false) => Some(Token::If(rest)),
            ("elif", false) => Some(Token::Elif(rest)),
            ("else", true) => Some(Token::Else),
            ("endif", true) => Some(Token::EndIf),
            ("for", false) => Token::for_loop(rest),
            ("endfor", true) => Some(Token::EndFor),
            _ => None
        }
    }

    fn for_loop(text: &'a str) -> Option<Token<'a>> {
        let words = text.split_whitespace().collect::<Vec<_>>();
        match words.as_slice() {
            [name, "in", iterable] if is_identifier(name) && is_identifier(iterable) => {
                Some(Token::For(*name, *iterable))
            },
            _ => None
        }
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c == '_' || c.is_alphanumeric())
}


trait ReaderStringOps {
    fn span_text(&self) -> usize;
    fn span_delimited(&self, open_delimiter: &str, close_delimiter: &str) -> Option<(&str, usize)>;
}

impl ReaderStringOps for str {
    // return the position of the next directive, or the end of the string
    fn span_text(&self) -> usize {
        let next_value = self.find(VALUE_OPEN).unwrap_or(self.len());
        let next_tag = self.find(TAG_OPEN).unwrap_or(self.len());
        next_value.min(next_tag)
    }

    // return the trimmed content of the directive starting the string and the position after it
    fn span_delimited(&self, open_delimiter: &str, close_delimiter: &str) -> Option<(&str, usize)> {
        let odl = open_delimiter.len();
        self[odl..].find(close_delimiter).map(
            |p| (self[odl..odl + p].trim(), odl + p + close_delimiter.len())
        )
    }
}
