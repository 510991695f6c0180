use anyhow::{Context, Result};
use kongkit::Document;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::cli::TargetArgs;

/// Load a declared-state document from `path`
///
/// Environment variables (`$VAR`, `${VAR}`) are expanded in the raw text
/// before parsing. Undefined variables expand to an empty string.
pub fn load(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let expanded = expand_env(&raw);
    parse(&expanded).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Load the document named by `target` and apply its host override
pub fn load_target(target: &TargetArgs) -> Result<Document> {
    let mut document = load(&target.config)?;
    if let Some(host) = &target.host {
        log::debug!("Overriding host {} with {}", document.host, host);
        document.host.clone_from(host);
    }
    if document.host.trim().is_empty() {
        anyhow::bail!(
            "No admin API host: set `host` in {} or pass --host",
            target.config.display()
        );
    }
    Ok(document)
}

/// Parse YAML text into a document
pub fn parse(text: &str) -> Result<Document> {
    serde_yaml::from_str(text).context("Invalid YAML document")
}

/// Expand environment variables from the process environment
pub fn expand_env(raw: &str) -> Cow<'_, str> {
    expand_with(raw, |var| std::env::var(var).ok())
}

/// Expand variables using `lookup`; unknown names become empty
fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Cow<'_, str> {
    shellexpand::env_with_context_no_errors(raw, |var| Some(lookup(var).unwrap_or_default()))
}
