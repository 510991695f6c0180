//! `validate` command: reference checks that never contact the gateway

use anyhow::{Result, bail};
use kongkit::Document;
use std::path::Path;

use crate::Context;
use crate::config;
use crate::ui;

pub fn run(ctx: &Context, path: &Path) -> Result<()> {
    let document = config::load(path)?;

    if !ctx.quiet {
        ui::header(&format!("Validating {}", path.display()));
        ui::kv("Admin API", &document.admin_url());
        ui::kv("Services", &document.services.len().to_string());
        ui::kv("Routes", &document.routes.len().to_string());
        ui::kv("Plugins", &document.plugins.len().to_string());
        ui::kv("Consumers", &document.consumers.len().to_string());
        ui::kv("Credentials", &document.credentials.len().to_string());
        println!();
    }

    ensure_valid(&document)?;
    if !ctx.quiet {
        ui::success("No reference problems found");
    }
    Ok(())
}

/// Print every reference issue and fail if there are any
pub fn ensure_valid(document: &Document) -> Result<()> {
    let issues = document.validate_references();
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        ui::error(&issue.to_string());
    }
    bail!("{} in config", ui::plural(issues.len(), "reference problem"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kongkit::{Route, Service};

    #[test]
    fn test_ensure_valid_accepts_consistent_document() {
        let document = Document {
            services: vec![Service::new("S1", "http://up:80")],
            routes: vec![Route {
                service: "S1".into(),
                ..Route::default()
            }],
            ..Document::default()
        };
        assert!(ensure_valid(&document).is_ok());
    }

    #[test]
    fn test_ensure_valid_reports_count() {
        let document = Document {
            routes: vec![
                Route {
                    service: "missing".into(),
                    ..Route::default()
                },
                Route {
                    service: "also-missing".into(),
                    ..Route::default()
                },
            ],
            ..Document::default()
        };
        let err = ensure_valid(&document).unwrap_err();
        assert_eq!(err.to_string(), "2 reference problems in config");
    }
}
