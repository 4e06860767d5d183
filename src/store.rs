use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use crate::error::TemplateError;


/// Source of template text, looked up by name.
pub trait TemplateStore {
    fn load(&self, name: &str) -> Result<String, TemplateError>;
}


/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct TemplateMap {
    templates: HashMap<String, String>
}

impl TemplateMap {
    pub fn new() -> Self {
        TemplateMap::default()
    }

    pub fn insert(&mut self, name: &str, source: &str) {
        self.templates.insert(name.to_owned(), source.to_owned());
    }

    pub fn with(mut self, name: &str, source: &str) -> Self {
        self.insert(name, source);
        self
    }
}

impl TemplateStore for TemplateMap {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        self.templates.get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_owned()))
    }
}


/// Templates read from a directory on every load, without caching.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    root: PathBuf
}

impl TemplateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TemplateDir {
            root: root.into()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateStore for TemplateDir {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        // names are relative paths that stay below the root
        let relative = Path::new(name);
        let escapes = relative.components().any(
            |c| !matches!(c, Component::Normal(_))
        );
        if name.is_empty() || escapes {
            return Err(TemplateError::NotFound(name.to_owned()));
        }
        let path = self.root.join(relative);
        debug!(path = %path.display(), "loading template");
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => TemplateError::NotFound(name.to_owned()),
            _ => TemplateError::Io { path, source }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lookup() {
        let store = TemplateMap::new().with("a.html", "<p>{{ a }}</p>");
        assert_eq!(store.load("a.html").unwrap(), "<p>{{ a }}</p>");
        assert!(matches!(store.load("b.html"), Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn dir_reads_fresh_on_every_load() {
        let root = std::env::temp_dir().join(format!("framelet-store-{}", std::process::id()));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("t.txt"), "one").unwrap();
        let store = TemplateDir::new(&root);
        assert_eq!(store.load("t.txt").unwrap(), "one");
        fs::write(root.join("t.txt"), "two").unwrap();
        assert_eq!(store.load("t.txt").unwrap(), "two");
        assert!(matches!(store.load("missing.txt"), Err(TemplateError::NotFound(_))));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn dir_rejects_escaping_names() {
        let store = TemplateDir::new("templates");
        for name in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(store.load(name), Err(TemplateError::NotFound(_))), "{}", name);
        }
    }
}
