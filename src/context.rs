use std::collections::HashMap;
use serde::Serialize;
use crate::error::ContextError;
use crate::value::Value;
use crate::JsonValue;


/// Read-only name lookup used by the expression evaluator.
pub trait Namespace {
    fn lookup(&self, name: &str) -> Option<&Value>;
}


/// Variables a template is rendered against.
///
/// A context is built by a handler for a single request. Rendering never
/// mutates it: loop bindings live in a [Scope] layered on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.values.insert(name.to_owned(), value.into());
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds a context from any serializable struct or map whose JSON
    /// form is an object of scalars and lists.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self, ContextError> {
        let json = serde_json::to_value(data)?;
        Context::from_json(&json)
    }

    pub fn from_json(json: &JsonValue) -> Result<Self, ContextError> {
        match json {
            JsonValue::Object(obj) => obj.iter()
                .map(|(name, value)| {
                    crate::json::to_value(name, value)
                        .map(|value| (name.to_owned(), value))
                })
                .collect::<Result<HashMap<_, _>, _>>()
                .map(|values| Context { values }),
            other => Err(ContextError::NotAnObject(crate::json::kind(other)))
        }
    }
}

impl Namespace for Context {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Context {
            values: iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        }
    }
}


/// A context with loop bindings stacked over it.
///
/// Each frame borrows its parent, so a derived scope shadows a name for the
/// duration of one iteration without copying or altering what lies below.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope<'a> {
    Root(&'a Context),
    Binding {
        name: &'a str,
        value: &'a Value,
        parent: &'a Scope<'a>,
    },
}

impl<'a> Scope<'a> {
    pub(crate) fn root(context: &'a Context) -> Self {
        Scope::Root(context)
    }

    pub(crate) fn bind(&'a self, name: &'a str, value: &'a Value) -> Scope<'a> {
        Scope::Binding { name, value, parent: self }
    }
}

impl<'a> Namespace for Scope<'a> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        let mut scope = self;
        loop {
            match scope {
                Scope::Root(context) => return context.lookup(name),
                Scope::Binding { name: bound, value, parent } => {
                    if *bound == name {
                        return Some(*value);
                    }
                    scope = *parent;
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_shadows_without_mutating_parent() {
        let context = Context::new().with("x", "outer").with("y", 2);
        let root = Scope::root(&context);
        let item = Value::from("inner");
        let derived = root.bind("x", &item);
        assert_eq!(derived.lookup("x"), Some(&Value::from("inner")));
        assert_eq!(derived.lookup("y"), Some(&Value::Int(2)));
        assert_eq!(root.lookup("x"), Some(&Value::from("outer")));
        assert_eq!(context.get("x"), Some(&Value::from("outer")));
    }

    #[test]
    fn from_serialize_struct() {
        #[derive(Serialize)]
        struct Greeting<'a> {
            name: &'a str,
            age: i64,
            tags: Vec<&'a str>,
        }
        let context = Context::from_serialize(
            &Greeting { name: "Bob", age: 30, tags: vec!["a", "b"] }
        ).unwrap();
        assert_eq!(context.get("name"), Some(&Value::from("Bob")));
        assert_eq!(context.get("age"), Some(&Value::Int(30)));
        assert_eq!(context.get("tags"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn from_serialize_rejects_scalars() {
        assert!(matches!(
            Context::from_serialize(&42),
            Err(ContextError::NotAnObject("number"))
        ));
    }
}
