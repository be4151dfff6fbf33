//! `{placeholder}` templates for task descriptions.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{CrewError, Result};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap_or_else(|e| panic!("placeholder pattern: {e}"))
});

/// Run inputs, keyed by placeholder name.
pub type Inputs = HashMap<String, String>;

/// A text with `{name}` placeholders filled from run inputs.
///
/// Only identifiers are placeholders; braces around anything else (`{}`,
/// `{"k": 1}`) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    placeholders: Vec<String>,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&source) {
            let name = &caps[1];
            if !placeholders.iter().any(|p| p == name) {
                placeholders.push(name.to_string());
            }
        }
        Self { source, placeholders }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Placeholders with no value in `inputs`.
    pub fn missing<'a>(&'a self, inputs: &Inputs) -> Vec<&'a str> {
        self.placeholders
            .iter()
            .filter(|p| !inputs.contains_key(p.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Substitute every placeholder.
    ///
    /// # Errors
    ///
    /// [`CrewError::InvalidArgument`] naming the first placeholder without a value.
    pub fn render(&self, inputs: &Inputs) -> Result<String> {
        if let Some(name) = self.missing(inputs).first() {
            return Err(CrewError::InvalidArgument(format!("missing input '{name}'")));
        }
        Ok(PLACEHOLDER
            .replace_all(&self.source, |caps: &Captures<'_>| inputs[&caps[1]].clone())
            .into_owned())
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Template {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}
