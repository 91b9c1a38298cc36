//! `tsync sync`: one full reconciliation pass.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use tsync_config::settings::SourceSettings;
use tsync_config::{resolve_secrets, ResolvedSecrets, UnusedKeyPolicy};
use tsync_destination::{TopicListClient, TopicListConfig};
use tsync_runtime::{PassOptions, SyncPass};
use tsync_source::{CsvColumnSource, ObjectQueryConfig, ObjectQuerySource, SourceFetcher};

pub struct SyncArgs<'a> {
    pub config_paths: &'a [String],
    pub dry_run: bool,
    pub exports_dir: Option<PathBuf>,
    pub fail_on_errors: bool,
}

pub async fn run_sync(args: SyncArgs<'_>) -> Result<()> {
    // Config and credentials are fully validated before any request is sent.
    let (loaded, mut settings) = super::load_settings(args.config_paths)?;
    if args.dry_run {
        settings.run.dry_run = true;
    }
    if let Some(dir) = args.exports_dir {
        settings.run.exports_dir = dir;
    }
    super::unused_keys(&loaded, &settings, UnusedKeyPolicy::Warn)?;
    let secrets = resolve_secrets(&settings)?;

    let source = build_source(&settings.source, &secrets)?;
    let client = TopicListClient::new(TopicListConfig {
        base_url: settings.destination.base_url.clone(),
        token: secrets.destination_token.clone(),
        timeout: settings.destination.request_timeout,
    })
    .context("destination client setup failed")?;

    let opts = PassOptions::from_settings(&settings);
    info!(
        config_hash = %loaded.config_hash,
        dry_run = opts.dry_run,
        membership = opts.policy.membership.as_str(),
        "starting sync"
    );

    let report = SyncPass::new(&*source, &client, &client, opts)
        .with_config_hash(loaded.config_hash.clone())
        .run()
        .await?;

    let art = tsync_artifacts::write_run_artifacts(&settings.run.exports_dir, &report)?;

    println!("run_id={}", report.run_id);
    println!("dry_run={}", report.dry_run);
    println!("config_hash={}", loaded.config_hash);
    println!("source_records={}", report.source.records);
    println!("source_truncated={}", report.source.truncation.is_some());
    println!("intents={}", report.intents.len());
    println!("applied={}", report.applied_count());
    println!("failed={}", report.failure_count());
    println!("run_dir={}", art.run_dir.display());

    if args.fail_on_errors && report.failure_count() > 0 {
        bail!(
            "SYNC_WRITE_FAILURES: {} of {} write(s) failed; see {}",
            report.failure_count(),
            report.intents.len(),
            art.report_path.display()
        );
    }
    Ok(())
}

fn build_source(
    source: &SourceSettings,
    secrets: &ResolvedSecrets,
) -> Result<Box<dyn SourceFetcher>> {
    match source {
        SourceSettings::ObjectQuery(q) => {
            let Some(token) = secrets.source_token.clone() else {
                bail!("SECRETS_MISSING: object query source requires '{}'", q.token_env);
            };
            let src = ObjectQuerySource::new(ObjectQueryConfig {
                base_url: q.base_url.clone(),
                query: q.query.clone(),
                page_size: q.page_size,
                token,
                timeout: q.request_timeout,
            })
            .context("source client setup failed")?;
            Ok(Box::new(src))
        }
        SourceSettings::Csv { path } => Ok(Box::new(CsvColumnSource::new(path.clone()))),
    }
}
