//! # Authorization Check
//!
//! Aggregates a JSON file of denormalized role rows and decides one request
//! against the result.
//!
//! ```text
//! authz-check <rows.json> <action> <resource-name> [resource-attribute-name]
//! ```
//!
//! The verdict and the effective permissions are printed to stdout as JSON.
//! Exits with status 1 unless the request is allowed.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info)
//! - `AUTHZ_SUBJECT_ID` - Subject id reported in the verdict (default: 0)

use anyhow::{bail, Context};
use iam_authz::source::load_rows;
use iam_authz::{aggregate, decide, MatcherRegistry, Resource, ResourceName, Subject};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Report<'a> {
    verdict: &'a iam_authz::Verdict,
    permissions: &'a iam_authz::EffectivePermissions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(path), Some(action), Some(resource_name)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: authz-check <rows.json> <action> <resource-name> [resource-attribute-name]");
    };
    let attribute_name = args.next();

    let subject_id: i64 = match std::env::var("AUTHZ_SUBJECT_ID") {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("Invalid AUTHZ_SUBJECT_ID '{}'", raw))?,
        Err(_) => 0,
    };

    let path = PathBuf::from(path);
    let rows = load_rows(&path)
        .await
        .with_context(|| format!("Failed to load rows from {}", path.display()))?;

    info!("Loaded {} rows from {}", rows.len(), path.display());

    let permissions = aggregate(&rows);

    let resource_name = ResourceName::parse(&resource_name)
        .with_context(|| format!("Invalid resource name '{}'", resource_name))?;
    let mut resource = Resource::new(resource_name.clone());
    if let Some(name) = attribute_name {
        resource = resource.with_name(name);
    }

    let subject = Subject::new(subject_id);
    let verdict = decide(
        &permissions,
        &MatcherRegistry::with_defaults(),
        &subject,
        &action,
        &resource,
    );

    info!("Decision for {} on {}: {}", action, resource_name, verdict.decision);

    let report = Report {
        verdict: &verdict,
        permissions: &permissions,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !verdict.is_allowed() {
        std::process::exit(1);
    }

    Ok(())
}
