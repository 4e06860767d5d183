use std::borrow::Cow;
use std::fmt::Debug;
use serde::Deserialize;
use tracing::{debug, warn};
use crate::context::{Context, Namespace, Scope};
use crate::error::{EvalError, TemplateError};
use crate::expression::Expression;
use crate::reader::{Reader, Token};
use crate::value::Value;


/// Which scope conditions inside a loop body are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionScope {
    /// Conditions nested in a loop body see the scope the outermost loop
    /// started in, so loop variables are unbound inside them. Values in the
    /// body, including those in the selected branch, still see the iteration.
    #[default]
    Enclosing,
    /// Conditions see the current iteration like every other directive.
    Iteration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub condition_scope: ConditionScope,
}


/// An expression that failed while rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub expression: String,
    pub error: EvalError,
}

/// Output of a render, with every evaluation failure that was absorbed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub failures: Vec<Failure>,
}


/// A template parsed into a tree of segments.
///
/// ```
/// use framelet::{Template, Context};
///
/// let template = Template::from(
///     "{% for task in tasks %}[{{ task }}]{% endfor %}"
/// ).unwrap();
/// let context = Context::new().with("tasks", vec!["a", "b"]);
/// assert_eq!(template.render(&context), "[a][b]");
/// ```
#[derive(Debug)]
pub struct Template {
    segments: Segments
}

impl Template {
    /// Parses `input`. Directives that are not well formed, and closing tags
    /// with no block to close, are kept as literal text; only an `if` or
    /// `for` left open, or nesting deeper than [MAX_BLOCK_DEPTH], is an error.
    pub fn from(input: &str) -> Result<Self, TemplateError> {
        let mut reader = Reader::new(input);
        let (segments, _) = parse(&mut reader, Block::Root, 0)?;
        Ok(Template { segments })
    }

    pub fn render(&self, context: &Context) -> String {
        self.render_with(context, &RenderOptions::default()).text
    }

    pub fn render_with(&self, context: &Context, options: &RenderOptions) -> Rendered {
        let mut state = RenderState {
            options: *options,
            failures: Vec::new(),
        };
        let text = self.segments.render(&Scope::root(context), None, &mut state);
        Rendered {
            text,
            failures: state.failures,
        }
    }
}


/// Parses `source` and renders it against `context` with default options.
pub fn render(source: &str, context: &Context) -> Result<String, TemplateError> {
    Ok(Template::from(source)?.render(context))
}


/// Deepest nesting of `if` and `for` blocks a template may use.
pub const MAX_BLOCK_DEPTH: usize = 100;


#[derive(Debug, Clone, Copy, PartialEq)]
enum Block {
    Root,
    If(usize),
    Else(usize),
    For(usize),
}

#[derive(Debug)]
enum Closer<'a> {
    End,
    Elif(&'a str),
    Else,
    EndIf,
    EndFor,
}

fn parse<'a>(
    reader: &mut Reader<'a>, block: Block, depth: usize
) -> Result<(Segments, Closer<'a>), TemplateError> {
    let mut segments = Segments::new();
    while let Some(token) = reader.pop_front() {
        let offset = reader.token_start();
        if matches!(token, Token::If(_) | Token::For(..)) && depth == MAX_BLOCK_DEPTH {
            return Err(TemplateError::syntax(offset, "blocks nested too deeply"));
        }
        let closer = match (token, block) {
            (Token::Elif(condition), Block::If(_)) => Closer::Elif(condition),
            (Token::Else, Block::If(_)) => Closer::Else,
            (Token::EndIf, Block::If(_) | Block::Else(_)) => Closer::EndIf,
            (Token::EndFor, Block::For(_)) => Closer::EndFor,
            (token, _) => {
                push_token(reader, token, offset, depth, &mut segments)?;
                continue;
            }
        };
        return Ok((segments, closer));
    }
    match block {
        Block::Root => Ok((segments, Closer::End)),
        Block::If(open) | Block::Else(open) => Err(TemplateError::syntax(open, "unclosed 'if'")),
        Block::For(open) => Err(TemplateError::syntax(open, "unclosed 'for'")),
    }
}

fn push_token<'a>(
    reader: &mut Reader<'a>, token: Token<'a>, offset: usize, depth: usize, segments: &mut Segments
) -> Result<(), TemplateError> {
    match token {
        Token::Text(text) => {
            segments.push(Box::new(
                TextSegment::new(text)
            ))
        },
        Token::Value(source) => {
            segments.push(Box::new(
                ValueSegment::new(source)
            ))
        },
        Token::If(condition) => {
            segments.push(Box::new(
                parse_conditional(reader, condition, offset, depth + 1)?
            ))
        },
        Token::For(name, iterable) => {
            let (children, _) = parse(reader, Block::For(offset), depth + 1)?;
            segments.push(Box::new(
                LoopSegment::new(name, iterable, children)
            ))
        },
        // a closing tag with nothing to close
        Token::Elif(_) | Token::Else | Token::EndIf | Token::EndFor => {
            segments.push(Box::new(
                TextSegment::new(reader.token_text())
            ))
        }
    }
    Ok(())
}

fn parse_conditional(
    reader: &mut Reader, condition: &str, open: usize, depth: usize
) -> Result<ConditionalSegment, TemplateError> {
    let mut branches = Vec::new();
    let mut condition = Expression::parse(condition);
    loop {
        let (children, closer) = parse(reader, Block::If(open), depth)?;
        branches.push((condition, children));
        match closer {
            Closer::Elif(next) => condition = Expression::parse(next),
            Closer::Else => {
                let (otherwise, _) = parse(reader, Block::Else(open), depth)?;
                return Ok(ConditionalSegment::new(branches, Some(otherwise)));
            },
            _ => return Ok(ConditionalSegment::new(branches, None))
        }
    }
}


struct RenderState {
    options: RenderOptions,
    failures: Vec<Failure>,
}

impl RenderState {
    fn fail(&mut self, expression: &str, error: EvalError) {
        debug!(expression, %error, "expression evaluation failed");
        self.failures.push(Failure {
            expression: expression.to_owned(),
            error,
        });
    }
}


// `conditions` is the scope conditionals evaluate against when it differs
// from the rendering scope, i.e. inside loop bodies with
// `ConditionScope::Enclosing`.
trait Segment: Debug {
    fn render(
        &self, scope: &Scope, conditions: Option<&Scope>, state: &mut RenderState
    ) -> String;
}

type Segments = Vec<Box<dyn Segment>>;

impl Segment for Segments {
    fn render(
        &self, scope: &Scope, conditions: Option<&Scope>, state: &mut RenderState
    ) -> String {
        self.iter()
            .map(|child| child.render(scope, conditions, state))
            .collect::<Vec<_>>()
            .concat()
    }
}


#[derive(Debug)]
struct TextSegment {
    text: String
}

impl TextSegment {
    fn new(text: &str) -> Self {
        TextSegment {
            text: text.to_owned()
        }
    }
}

impl Segment for TextSegment {
    fn render(
        &self, _scope: &Scope, _conditions: Option<&Scope>, _state: &mut RenderState
    ) -> String {
        self.text.clone()
    }
}


#[derive(Debug)]
struct ValueSegment {
    expression: Expression
}

impl ValueSegment {
    fn new(source: &str) -> Self {
        ValueSegment {
            expression: Expression::parse(source)
        }
    }
}

impl Segment for ValueSegment {
    fn render(
        &self, scope: &Scope, _conditions: Option<&Scope>, state: &mut RenderState
    ) -> String {
        match self.expression.evaluate(scope) {
            Ok(value) => value.to_string(),
            Err(error) => {
                state.fail(self.expression.source(), error);
                String::new()
            }
        }
    }
}


#[derive(Debug)]
struct ConditionalSegment {
    branches: Vec<(Expression, Segments)>,
    otherwise: Option<Segments>
}

impl ConditionalSegment {
    fn new(branches: Vec<(Expression, Segments)>, otherwise: Option<Segments>) -> Self {
        ConditionalSegment {
            branches,
            otherwise
        }
    }
}

impl Segment for ConditionalSegment {
    fn render(
        &self, scope: &Scope, conditions: Option<&Scope>, state: &mut RenderState
    ) -> String {
        let condition_scope = conditions.unwrap_or(scope);
        for (condition, children) in &self.branches {
            match condition.evaluate(condition_scope) {
                Ok(value) if value.is_truthy() => {
                    return children.render(scope, conditions, state);
                },
                Ok(_) => {},
                Err(error) => state.fail(condition.source(), error)
            }
        }
        match &self.otherwise {
            Some(children) => children.render(scope, conditions, state),
            None => String::new()
        }
    }
}


#[derive(Debug)]
struct LoopSegment {
    name: String,
    iterable: String,
    children: Segments
}

impl LoopSegment {
    fn new(name: &str, iterable: &str, children: Segments) -> Self {
        LoopSegment {
            name: name.to_owned(),
            iterable: iterable.to_owned(),
            children
        }
    }
}

impl Segment for LoopSegment {
    fn render(
        &self, scope: &Scope, conditions: Option<&Scope>, state: &mut RenderState
    ) -> String {
        let items: Cow<[Value]> = match scope.lookup(&self.iterable) {
            // a missing sequence is an empty one
            None => return String::new(),
            Some(Value::List(items)) => Cow::Borrowed(items.as_slice()),
            Some(Value::Str(text)) => Cow::Owned(
                text.chars().map(|c| Value::Str(c.to_string())).collect()
            ),
            Some(other) => {
                warn!(iterable = %self.iterable, kind = other.type_name(), "loop over a non-sequence");
                state.fail(&self.iterable, EvalError::type_error(format!(
                    "'{}' object is not iterable", other.type_name()
                )));
                return String::new();
            }
        };
        let conditions = match state.options.condition_scope {
            ConditionScope::Enclosing => Some(conditions.unwrap_or(scope)),
            ConditionScope::Iteration => None,
        };
        items.iter()
            .map(|item| {
                let frame = scope.bind(&self.name, item);
                self.children.render(&frame, conditions, state)
            })
            .collect::<Vec<_>>()
            .concat()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn render_ok(text: &str, context: &Context) -> String {
        Template::from(text).unwrap().render(context)
    }

    fn syntax_error(text: &str) -> (usize, String) {
        match Template::from(text) {
            Err(TemplateError::Syntax { offset, message }) => (offset, message),
            other => panic!("expected syntax error, got {:?}", other.map(|_| ()))
        }
    }

    #[test]
    fn nested_conditionals() {
        let text = "{% if a %}A{% if b %}B{% else %}b{% endif %}{% else %}-{% endif %}";
        let both = Context::new().with("a", true).with("b", true);
        let only_a = Context::new().with("a", true).with("b", false);
        let none = Context::new().with("a", false).with("b", true);
        assert_eq!(render_ok(text, &both), "AB");
        assert_eq!(render_ok(text, &only_a), "Ab");
        assert_eq!(render_ok(text, &none), "-");
    }

    #[test]
    fn nested_loops() {
        let text = "{% for r in rows %}{% for c in cols %}{{ r }}{{ c }} {% endfor %}{% endfor %}";
        let context = Context::new()
            .with("rows", vec![1, 2])
            .with("cols", vec!["a", "b"]);
        assert_eq!(render_ok(text, &context), "1a 1b 2a 2b ");
    }

    #[test]
    fn discarded_branches_are_not_evaluated() {
        let template = Template::from(
            "{% if True %}ok{% else %}{{ missing }}{% endif %}"
        ).unwrap();
        let rendered = template.render_with(&Context::new(), &RenderOptions::default());
        assert_eq!(rendered.text, "ok");
        assert!(rendered.failures.is_empty());
    }

    #[test]
    fn later_conditions_are_not_evaluated_after_a_match() {
        let template = Template::from(
            "{% if 1 %}one{% elif missing %}two{% endif %}"
        ).unwrap();
        let rendered = template.render_with(&Context::new(), &RenderOptions::default());
        assert_eq!(rendered.text, "one");
        assert!(rendered.failures.is_empty());
    }

    #[test]
    fn string_iterates_characters() {
        let context = Context::new().with("word", "abc");
        assert_eq!(render_ok("{% for c in word %}{{ c }}.{% endfor %}", &context), "a.b.c.");
    }

    #[test]
    fn non_sequence_loop_is_a_failure() {
        let template = Template::from("[{% for c in n %}x{% endfor %}]").unwrap();
        let rendered = template.render_with(&Context::new().with("n", 3), &RenderOptions::default());
        assert_eq!(rendered.text, "[]");
        assert_eq!(rendered.failures.len(), 1);
        assert_eq!(rendered.failures[0].expression, "n");
    }

    #[test]
    fn enclosing_condition_scope_hides_loop_variable() {
        let template = Template::from(
            "{% for t in tasks %}{% if t == 'b' %}[{{ t }}]{% else %}{{ t }}{% endif %}{% endfor %}"
        ).unwrap();
        let context = Context::new().with("tasks", vec!["a", "b"]);
        let rendered = template.render_with(&context, &RenderOptions::default());
        assert_eq!(rendered.text, "ab");
        assert_eq!(rendered.failures.len(), 2);
        assert_eq!(rendered.failures[0].error, EvalError::UnknownName("t".to_owned()));

        let options = RenderOptions { condition_scope: ConditionScope::Iteration };
        let rendered = template.render_with(&context, &options);
        assert_eq!(rendered.text, "a[b]");
        assert!(rendered.failures.is_empty());
    }

    #[test]
    fn enclosing_condition_scope_sees_outer_names() {
        let template = Template::from(
            "{% for t in tasks %}{% if show %}{{ t }}{% endif %}{% endfor %}"
        ).unwrap();
        let context = Context::new()
            .with("tasks", vec!["a", "b"])
            .with("show", true);
        assert_eq!(template.render(&context), "ab");
    }

    #[test]
    fn unclosed_blocks_carry_offsets() {
        assert_eq!(syntax_error("x{% if a %}y"), (1, "unclosed 'if'".to_owned()));
        assert_eq!(syntax_error("{% for x in xs %}"), (0, "unclosed 'for'".to_owned()));
        assert_eq!(syntax_error("{% if a %}{% else %}y"), (0, "unclosed 'if'".to_owned()));
        assert_eq!(syntax_error("{% for x in xs %}{% endif %}"), (0, "unclosed 'for'".to_owned()));
    }

    #[test]
    fn malformed_directives_pass_through() {
        let context = Context::new().with("b", 1);
        assert_eq!(render_ok("a {{ b", &context), "a {{ b");
        assert_eq!(render_ok("50% {% raw %} x", &context), "50% {% raw %} x");
        assert_eq!(render_ok("{% for x of xs %}", &context), "{% for x of xs %}");
        assert_eq!(render_ok("{% if %}{{ b }}", &context), "{% if %}1");
        assert_eq!(render_ok("{% if b {{ b }}", &context), "{% if b 1");
    }

    #[test]
    fn stray_closers_pass_through() {
        let context = Context::new().with("a", true).with("xs", vec![1]);
        assert_eq!(render_ok("text {% endif %} tail", &context), "text {% endif %} tail");
        assert_eq!(render_ok("{% else %}{%endfor%}{% elif a %}", &context), "{% else %}{%endfor%}{% elif a %}");
        assert_eq!(
            render_ok("{% for x in xs %}{{ x }}{% endif %}{% endfor %}", &context),
            "1{% endif %}"
        );
        assert_eq!(
            render_ok("{% if False %}{% else %}b{% else %}c{% elif a %}d{% endif %}", &context),
            "b{% else %}c{% elif a %}d"
        );
    }

    #[test]
    fn block_nesting_is_limited() {
        let nested = |depth: usize| format!(
            "{}x{}", "{% if True %}".repeat(depth), "{% endif %}".repeat(depth)
        );
        assert_eq!(render_ok(&nested(MAX_BLOCK_DEPTH), &Context::new()), "x");
        let (offset, message) = syntax_error(&nested(MAX_BLOCK_DEPTH + 1));
        assert_eq!(offset, MAX_BLOCK_DEPTH * "{% if True %}".len());
        assert_eq!(message, "blocks nested too deeply");
        let deep = "{% for x in xs %}".repeat(200_000);
        assert_eq!(syntax_error(&deep).1, "blocks nested too deeply");
    }

    #[test]
    fn deep_expressions_are_soft_failures() {
        let source = format!("[{{{{ {}1{} }}}}]", "(".repeat(200_000), ")".repeat(200_000));
        let template = Template::from(&source).unwrap();
        let rendered = template.render_with(&Context::new(), &RenderOptions::default());
        assert_eq!(rendered.text, "[]");
        assert!(matches!(rendered.failures[0].error, EvalError::Syntax { .. }));
    }

    #[test]
    fn oversized_values_are_soft_failures() {
        let template = Template::from("[{{ 'ab' * 9223372036854775807 }}]").unwrap();
        let rendered = template.render_with(&Context::new(), &RenderOptions::default());
        assert_eq!(rendered.text, "[]");
        assert!(matches!(rendered.failures[0].error, EvalError::TooLarge { .. }));
    }

    #[test]
    fn malformed_expression_is_a_soft_failure() {
        let template = Template::from("a{{ 1 + }}b").unwrap();
        let rendered = template.render_with(&Context::new(), &RenderOptions::default());
        assert_eq!(rendered.text, "ab");
        assert!(matches!(rendered.failures[0].error, EvalError::Syntax { .. }));
    }
}
