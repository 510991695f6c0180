//! `apply` and `plugins` commands
//!
//! Both load the config, connect to the admin API and hand the document to
//! the reconciler. Printing happens through [`ConsoleProgress`].

use anyhow::Result;
use colored::Colorize;
use kongkit::{AdminClient, Document};
use reconciler::{ApplySummary, Reconciler, RouteIndex};
use std::time::Duration;

use crate::Context;
use crate::cli::{ApplyArgs, TargetArgs};
use crate::commands::validate;
use crate::config;
use crate::progress::ConsoleProgress;
use crate::ui;

/// Tear down the gateway and rebuild it from the config file
pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let document = config::load_target(&args.target)?;
    if args.validate {
        validate::ensure_valid(&document)?;
    }
    warn_unapplied(&document);
    if document.services.is_empty() && !ctx.quiet {
        ui::info("No services declared; the gateway will be left empty");
    }

    let client = connect(&args.target, &document);
    let reconciler = Reconciler::new(&client);
    let mut progress = ConsoleProgress::new(ctx);

    if !ctx.quiet {
        ui::header(&format!("Applying {}", args.target.config.display()));
        ui::kv("Admin API", client.base_url());
    }

    let mut summary = reconciler.apply(&document, &mut progress)?;
    if args.plugins {
        let plugins = reconciler.apply_plugins(&document, &summary.route_index, &mut progress)?;
        summary.merge(plugins);
    }

    if !ctx.quiet {
        print_summary(&summary);
    }
    Ok(())
}

/// Create the declared plugins without touching anything else
pub fn plugins(ctx: &Context, args: TargetArgs) -> Result<()> {
    let document = config::load_target(&args)?;
    let client = connect(&args, &document);
    let mut progress = ConsoleProgress::new(ctx);

    if !ctx.quiet {
        ui::header(&format!("Applying plugins from {}", args.config.display()));
        ui::kv("Admin API", client.base_url());
    }

    // Route targets are taken as literal remote ids outside an apply run
    let summary =
        Reconciler::new(&client).apply_plugins(&document, &RouteIndex::new(), &mut progress)?;

    if !ctx.quiet {
        print_summary(&summary);
    }
    Ok(())
}

fn connect(target: &TargetArgs, document: &Document) -> AdminClient {
    let url = document.admin_url();
    log::debug!("Connecting to {url} (timeout {}s)", target.timeout);
    AdminClient::with_timeout(url, Duration::from_secs(target.timeout))
}

/// Warn about declared sections this tool reads but never applies
fn warn_unapplied(document: &Document) {
    if !document.credentials.is_empty() {
        ui::warn(&format!(
            "{} declared but not applied",
            ui::plural(document.credentials.len(), "credential")
        ));
    }
    if !document.consumers.is_empty() {
        ui::warn(&format!(
            "{} declared; consumers are only deleted, never created",
            ui::plural(document.consumers.len(), "consumer")
        ));
    }
}

fn print_summary(summary: &ApplySummary) {
    println!();
    println!(
        "{} {} ({} listed, {} deleted, {} upserted, {} created)",
        "Done:".green().bold(),
        ui::plural(summary.total_changes(), "change"),
        summary.listed,
        summary.deleted,
        summary.upserted,
        summary.created
    );
    if !summary.route_index.is_empty() {
        ui::dim(&format!(
            "{} indexed for plugin targeting",
            ui::plural(summary.route_index.len(), "named route")
        ));
    }
}
