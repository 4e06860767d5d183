//! Demo application: dispatches one request and prints the response.
//!
//! ```text
//! framelet --config demos/framelet.yml GET /status/20
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use clap::Parser;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;
use framelet::{
    Config, Context, Engine, HandlerError, Response, Router, TemplateDir
};


#[derive(Parser, Debug)]
#[command(name = "framelet", version, about = "Dispatch a request against the demo routes")]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request method, GET or POST
    method: String,

    /// Request path, e.g. /hello/Bob/30/Paris
    path: String,
}

#[derive(Serialize)]
struct Greeting<'a> {
    name: &'a str,
    age: i64,
    city: &'a str,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default()
    };
    init_logging(&config.log);

    let engine = Arc::new(Engine::with_options(
        TemplateDir::new(&config.templates),
        config.render_options(),
    ));
    let router = routes(engine);

    let (response, code) = match router.dispatch(&args.method, &args.path) {
        Ok(response) => (response, ExitCode::SUCCESS),
        Err(err) => {
            error!(error = %err, "request failed");
            (Response::internal_error(), ExitCode::FAILURE)
        }
    };
    println!("HTTP/1.0 {}", response.status);
    println!("Content-Type: {}", response.content_type);
    println!();
    println!("{}", response.body);
    code
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn routes(engine: Arc<Engine<TemplateDir>>) -> Router {
    let greeting = Arc::clone(&engine);
    let profile = Arc::clone(&engine);
    let status = Arc::clone(&engine);
    let tasks = engine;
    Router::builder()
        .get("/hello/<name>/<age>/<city>", move |params| {
            let context = Context::from_serialize(&Greeting {
                name: params.require("name")?,
                age: params.parse("age")?,
                city: params.require("city")?,
            })?;
            render(&greeting, "greeting.html", &context)
        })
        .get("/profile/<name>/<age>", move |params| {
            let context = Context::new()
                .with("name", params.require("name")?)
                .with("age", params.parse::<i64>("age")?);
            render(&profile, "profile.html", &context)
        })
        .get("/status/<temperature>", move |params| {
            let context = Context::new()
                .with("temperature", params.parse::<i64>("temperature")?);
            render(&status, "status.html", &context)
        })
        .get("/tasks", move |_| {
            let context = Context::new().with(
                "tasks",
                vec!["Write code", "Review notes", "Run server", "Test app"],
            );
            render(&tasks, "tasks.html", &context)
        })
        .build()
}

fn render(engine: &Engine<TemplateDir>, name: &str, context: &Context) -> Result<String, HandlerError> {
    Ok(engine.render(name, context)?)
}
