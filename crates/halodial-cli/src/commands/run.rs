use crate::commands::{print_json, Context};
use crate::error::partial_failure;
use anyhow::{Context as _, Result};
use clap::Args;
use halodial_api::client::{HaloClient, HaloClientOptions};
use halodial_api::migrate::{run_migration, MigrationOptions};
use halodial_api::secret::{
    resolve_credential, AwsSecretsManager, EnvSecret, FileSecret, SecretResolver,
};
use halodial_config::{SecretBackend, SecretConfig};
use halodial_core::{FieldChangeDto, OutcomeStatus, RunReportDto};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Site to process; overrides halo.site_id from the config file
    #[arg(long)]
    pub site_id: Option<u64>,
    /// Plan the rewrites without posting any updates
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(ctx: &Context<'_>, args: RunArgs) -> Result<()> {
    let halo = &ctx.config.halo;
    let site_id = halo.resolve_site_id(args.site_id)?;
    let base_url = halo.require_base_url()?.clone();

    let resolver = secret_resolver(&ctx.config.secret)?;
    let credential =
        resolve_credential(resolver.as_ref()).with_context(|| "retrieve access token")?;

    let client = HaloClient::new(
        HaloClientOptions {
            base_url,
            page_size: halo.page_size,
            response_shape: halo.response_shape,
            update_endpoint: halo.update_endpoint,
            timeout: Duration::from_secs(halo.timeout_secs),
            user_agent: halo.user_agent.clone(),
        },
        credential,
    )
    .with_context(|| "build http client")?;

    let report = run_migration(
        &client,
        site_id,
        MigrationOptions {
            dry_run: args.dry_run,
        },
    )
    .with_context(|| format!("update phone numbers for site {site_id}"))?;

    if ctx.json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if report.has_failures() {
        return Err(partial_failure(
            report.failed,
            report.updated + report.failed,
        ));
    }
    Ok(())
}

fn secret_resolver(config: &SecretConfig) -> Result<Box<dyn SecretResolver>> {
    let resolver: Box<dyn SecretResolver> = match config.backend {
        SecretBackend::Aws => Box::new(AwsSecretsManager::new(
            config.name.clone(),
            config.region.clone(),
        )),
        SecretBackend::Env => Box::new(EnvSecret::new(config.env.clone())),
        SecretBackend::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("secret.path is required for the file backend"))?;
            Box::new(FileSecret::new(path))
        }
    };
    Ok(resolver)
}

fn print_report(report: &RunReportDto) {
    println!(
        "Site {}: fetched {} users, {} already in international format or without a number",
        report.site_id, report.fetched, report.unchanged
    );

    for outcome in &report.outcomes {
        let label = match outcome.status {
            OutcomeStatus::Planned => "Would update",
            OutcomeStatus::Updated => "Updated",
            OutcomeStatus::Failed => "Failed",
        };
        println!(
            "{} {} ({}): {}",
            label,
            outcome.user_name,
            outcome.user_id,
            format_changes(&outcome.changes)
        );
        if let Some(error) = &outcome.error {
            println!("  error: {}", error);
        }
    }

    if report.dry_run {
        println!("Dry run: {} users would be updated", report.planned);
    } else {
        println!(
            "Summary: updated {}, failed {}",
            report.updated, report.failed
        );
    }
}

fn format_changes(changes: &[FieldChangeDto]) -> String {
    changes
        .iter()
        .map(|change| format!("{} {} -> {}", change.field, change.from, change.to))
        .collect::<Vec<_>>()
        .join(", ")
}
