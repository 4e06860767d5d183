//! A minimal web-request dispatcher with a small template engine.
//!
//! A [Router] maps (method, path pattern) pairs to handlers. A handler
//! receives the [Params] captured from the path, builds a [Context] and
//! usually renders a [Template] against it, directly or through an
//! [Engine] reading templates from a [TemplateStore].
//!
//! Templates understand three directive forms:
//! - `{{ expr }}` substitutes the value of an expression,
//! - `{% if c %}…{% elif c %}…{% else %}…{% endif %}` selects a branch,
//! - `{% for v in list %}…{% endfor %}` repeats its body per item.
//!
//! Expressions are evaluated by a restricted interpreter: only names in the
//! context resolve, and there is no way to call anything. A failing
//! expression never aborts a render, it renders as empty text (or as a false
//! condition) and is reported in [Rendered::failures].
//!
//!
//! # Samples
//!
//! ## Hello world
//!
//! ```
//! use framelet::{Template, Context};
//!
//! let template = Template::from("hello, {{ you }}!").unwrap();
//! let context = Context::new().with("you", "world");
//!
//! assert_eq!(template.render(&context), "hello, world!");
//! ```
//!
//! ## Weather station
//!
//! ```
//! use framelet::{Context, Engine, Router, TemplateMap};
//! use std::sync::Arc;
//!
//! let store = TemplateMap::new().with(
//!     "status.html",
//!     "{% if temperature > 30 %}Hot{% elif temperature > 15 %}Mild{% else %}Cold{% endif %}"
//! );
//! let engine = Arc::new(Engine::new(store));
//!
//! let router = Router::builder()
//!     .get("/status/<temperature>", move |params| {
//!         let context = Context::new()
//!             .with("temperature", params.parse::<i64>("temperature")?);
//!         Ok(engine.render("status.html", &context)?)
//!     })
//!     .build();
//!
//! let response = router.dispatch("GET", "/status/20").unwrap();
//! assert_eq!(response.body, "Mild");
//! assert_eq!(response.content_type.as_str(), "text/plain");
//!
//! let response = router.dispatch("GET", "/weather").unwrap();
//! assert_eq!(response.status.code(), 404);
//! ```
//!
//! ## Context from data
//!
//! ```
//! use framelet::{Template, Context, YamlValue};
//!
//! let data = r#"
//!   team: [john, 42]
//! "#;
//! let yaml = serde_yaml::from_str::<YamlValue>(data).unwrap();
//! let context = Context::try_from(&yaml).unwrap();
//!
//! let template = Template::from(
//!     "{% for member in team %}hello, {{ member }}! {% endfor %}"
//! ).unwrap();
//! assert_eq!(template.render(&context), "hello, john! hello, 42! ");
//! ```
mod value;
mod context;
mod json;
mod yaml;
mod tokens;
mod expression;
mod reader;
mod template;
mod store;
mod engine;
mod response;
mod router;
mod config;
mod error;

pub use self::value::Value;
pub use self::context::{Context, Namespace};
pub use self::json::JsonValue;
pub use self::yaml::YamlValue;
pub use self::expression::{
    evaluate, Evaluation, Expression, MAX_EXPRESSION_DEPTH, MAX_SEQUENCE_LEN
};
pub use self::template::{
    render, ConditionScope, Failure, RenderOptions, Rendered, Template, MAX_BLOCK_DEPTH
};
pub use self::store::{TemplateDir, TemplateMap, TemplateStore};
pub use self::engine::Engine;
pub use self::response::{ContentType, Response, Status};
pub use self::router::{Handler, Method, Params, Pattern, Router, RouterBuilder};
pub use self::config::Config;
pub use self::error::{
    ConfigError, ContextError, DispatchError, EvalError, HandlerError, ParamError, TemplateError
};
