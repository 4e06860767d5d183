//! Dispatch outcomes handed to the transport.
//!
//! # Design Decisions
//! - Content type is advisory: it is picked from the first non-blank
//!   character of the body, the body itself is never parsed
//! - Not-found is a regular response, not an error

use std::fmt;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Plain,
}

impl ContentType {
    /// Markup if the body starts with `<` once leading whitespace is skipped.
    pub fn classify(body: &str) -> Self {
        if body.trim_start().starts_with('<') {
            ContentType::Html
        } else {
            ContentType::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Plain => "text/plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_type: ContentType,
    pub body: String,
}

impl Response {
    pub fn ok(body: String) -> Self {
        Response {
            status: Status::Ok,
            content_type: ContentType::classify(&body),
            body,
        }
    }

    pub fn not_found() -> Self {
        Response {
            status: Status::NotFound,
            content_type: ContentType::Plain,
            body: "404 Not Found".to_owned(),
        }
    }

    pub fn internal_error() -> Self {
        Response {
            status: Status::InternalServerError,
            content_type: ContentType::Plain,
            body: "500 Internal Server Error".to_owned(),
        }
    }
}
