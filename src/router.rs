//! Route registration and dispatch.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     (method, "/lit/<name>", handler)
//!     → Pattern::compile (literal and capture segments)
//!     → RouterBuilder (append only, registration order kept)
//!     → build() freezes an immutable Router
//!
//! Request:
//!     (method, path)
//!     → first route with equal method whose pattern matches the whole path
//!     → handler(params) → Response (200, content type from body)
//!     → no match → Response (404)
//! ```
//!
//! # Design Decisions
//! - Routes are compiled at startup and never change afterwards, so a
//!   `Router` can be shared by reference across threads without locks
//! - First registered, first tried; no deduplication or ambiguity checks
//! - Captured parameters stay strings, handlers do their own coercion
//! - Handler errors are returned to the caller untouched, only an unmatched
//!   request is turned into a response here

use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use crate::error::{DispatchError, HandlerError, ParamError};
use crate::response::Response;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            _ => Err(format!("unsupported method '{}'", s))
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled path template such as `/hello/<name>/<age>`.
///
/// Each `/` separated component is either matched verbatim or, when written
/// `<name>`, captures one or more characters other than `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn compile(path: &str) -> Self {
        let segments = path.trim_matches('/')
            .split('/')
            .map(|part| match part.strip_prefix('<').and_then(|it| it.strip_suffix('>')) {
                Some(name) => Segment::Capture(name.to_owned()),
                None => Segment::Literal(part.to_owned())
            })
            .collect();
        Pattern {
            source: path.to_owned(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Capture names in the order they appear in the pattern.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None
        })
    }

    /// Matches the whole of `path`, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let rest = path.strip_prefix('/')?;
        let parts = rest.split('/').collect::<Vec<_>>();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {},
                Segment::Capture(name) if !part.is_empty() => params.push(name, part),
                _ => return None
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}


/// Parameters captured from a request path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    fn push(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_owned(), value.to_owned()));
    }

    /// Value bound to `name`; when a name is captured twice the last one wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, name: &str) -> Result<&str, ParamError> {
        self.get(name).ok_or_else(|| ParamError::Missing(name.to_owned()))
    }

    /// Parses the value bound to `name`, e.g. `params.parse::<i64>("age")`.
    pub fn parse<T>(&self, name: &str) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let value = self.require(name)?;
        value.parse::<T>().map_err(|err| ParamError::Invalid {
            name: name.to_owned(),
            value: value.to_owned(),
            reason: err.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}


pub type Handler = Box<dyn Fn(&Params) -> Result<String, HandlerError> + Send + Sync>;

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Route {{ {} {} }}", self.method, self.pattern)
    }
}


/// Collects routes before freezing them into a [Router].
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        RouterBuilder::default()
    }

    pub fn route<F>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(&Params) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        let pattern = Pattern::compile(path);
        debug!(%method, pattern = %pattern, "registering route");
        self.routes.push(Route {
            method,
            pattern,
            handler: Box::new(handler),
        });
        self
    }

    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Params) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.route(Method::Get, path, handler)
    }

    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Params) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.route(Method::Post, path, handler)
    }

    pub fn build(self) -> Router {
        info!(routes = self.routes.len(), "router ready");
        Router {
            routes: self.routes,
        }
    }
}


/// Immutable, ordered route table.
///
/// ```
/// use framelet::{Router, Status};
///
/// let router = Router::builder()
///     .get("/hello/<name>", |params| Ok(format!("<p>hi {}</p>", params.get("name").unwrap_or(""))))
///     .build();
///
/// let response = router.dispatch("GET", "/hello/Bob").unwrap();
/// assert_eq!(response.status, Status::Ok);
/// assert_eq!(response.content_type.as_str(), "text/html");
/// assert_eq!(response.body, "<p>hi Bob</p>");
///
/// let response = router.dispatch("POST", "/hello/Bob").unwrap();
/// assert_eq!(response.status, Status::NotFound);
/// ```
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatches a request to the first matching route.
    ///
    /// An unknown method or unmatched path yields the 404 response; a
    /// failing handler is returned as [DispatchError::Handler].
    pub fn dispatch(&self, method: &str, path: &str) -> Result<Response, DispatchError> {
        let method = match method.parse::<Method>() {
            Ok(method) => method,
            Err(_) => {
                debug!(method, path, "no route for method");
                return Ok(Response::not_found());
            }
        };
        let matched = self.routes.iter()
            .filter(|route| route.method == method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)));
        match matched {
            Some((route, params)) => {
                debug!(%method, path, pattern = %route.pattern, "route matched");
                let body = (route.handler)(&params).map_err(|source| DispatchError::Handler {
                    method: route.method.as_str(),
                    pattern: route.pattern.as_str().to_owned(),
                    source,
                })?;
                Ok(Response::ok(body))
            },
            None => {
                debug!(%method, path, "no route matched");
                Ok(Response::not_found())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn captures(pattern: &str, path: &str) -> Option<Vec<(String, String)>> {
        Pattern::compile(pattern).matches(path).map(|params| {
            params.iter()
                .map(|(n, v)| (n.to_owned(), v.to_owned()))
                .collect()
        })
    }

    #[test]
    fn pattern_captures_segments() {
        assert_eq!(
            captures("/hello/<name>/<age>/<city>", "/hello/Bob/30/Paris"),
            Some(vec![
                ("name".to_owned(), "Bob".to_owned()),
                ("age".to_owned(), "30".to_owned()),
                ("city".to_owned(), "Paris".to_owned()),
            ])
        );
    }

    #[test]
    fn pattern_requires_whole_path() {
        assert_eq!(captures("/hello/<name>/<age>/<city>", "/hello/Bob/30"), None);
        assert_eq!(captures("/hello/<name>", "/hello/Bob/30"), None);
        assert_eq!(captures("/hello/<name>", "/hello/"), None);
        assert_eq!(captures("/hello/<name>", "hello/Bob"), None);
        assert_eq!(captures("/hello", "/hello/"), None);
        assert_eq!(captures("/hello", "/Hello"), None);
    }

    #[test]
    fn pattern_ignores_surrounding_slashes() {
        assert_eq!(captures("/tasks/", "/tasks"), Some(vec![]));
        assert_eq!(captures("tasks", "/tasks"), Some(vec![]));
    }

    #[test]
    fn root_pattern() {
        assert_eq!(captures("/", "/"), Some(vec![]));
        assert_eq!(captures("/", "/x"), None);
    }

    #[test]
    fn param_names_follow_pattern_order() {
        let pattern = Pattern::compile("/a/<x>/b/<y>");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(Pattern::compile("/static/<>x").param_names().count(), 0);
    }

    #[test]
    fn params_parse() {
        let params = Pattern::compile("/p/<age>/<name>").matches("/p/30/Bob").unwrap();
        assert_eq!(params.parse::<i64>("age").unwrap(), 30);
        assert!(matches!(params.parse::<i64>("name"), Err(ParamError::Invalid { .. })));
        assert!(matches!(params.parse::<i64>("city"), Err(ParamError::Missing(_))));
    }

    #[test]
    fn repeated_capture_name_keeps_last() {
        let params = Pattern::compile("/<x>/<x>").matches("/a/b").unwrap();
        assert_eq!(params.get("x"), Some("b"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn first_registered_route_wins() {
        let router = Router::builder()
            .get("/items/<id>", |params| Ok(format!("id {}", params.get("id").unwrap_or(""))))
            .get("/items/new", |_| Ok("new".to_owned()))
            .build();
        assert_eq!(router.dispatch("GET", "/items/new").unwrap().body, "id new");
    }

    #[test]
    fn method_must_match() {
        let router = Router::builder()
            .post("/submit", |_| Ok("done".to_owned()))
            .build();
        assert_eq!(router.dispatch("GET", "/submit").unwrap(), Response::not_found());
        assert_eq!(router.dispatch("PUT", "/submit").unwrap(), Response::not_found());
        assert_eq!(router.dispatch("POST", "/submit").unwrap().body, "done");
    }

    #[test]
    fn handler_error_propagates() {
        let router = Router::builder()
            .get("/age/<age>", |params| {
                let age = params.parse::<i64>("age")?;
                Ok(age.to_string())
            })
            .build();
        assert_eq!(router.dispatch("GET", "/age/7").unwrap().body, "7");
        match router.dispatch("GET", "/age/seven") {
            Err(DispatchError::Handler { method, pattern, .. }) => {
                assert_eq!(method, "GET");
                assert_eq!(pattern, "/age/<age>");
            },
            other => panic!("expected handler error, got {:?}", other)
        }
    }
}
