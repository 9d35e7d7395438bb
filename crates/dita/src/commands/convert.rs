//! `dita convert` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use dita_config::{CliSettings, Config, PolicySetting};
use dita_renderer::{ConversionOptions, Diagnostic, Rules, html_path};
use dita_site::{
    DocumentIndex, PageError, TOC_FILE, TopicId, convert_topic, render_page, render_toc_page,
};
use dita_storage::FsStorage;
use rayon::prelude::*;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Root map file (overrides config).
    map: Option<PathBuf>,

    /// Output directory for the generated HTML (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Token accepted in deliveryTarget attributes (overrides config).
    #[arg(long, env = "DITA_DELIVERY_TARGET")]
    delivery_target: Option<String>,

    /// Path to configuration file (default: auto-discover dita.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Outcome of converting one topic.
struct TopicResult {
    path: String,
    result: Result<Vec<Diagnostic>, CliError>,
}

/// Totals of a site conversion.
#[derive(Debug, Default)]
struct Summary {
    written: usize,
    diagnostics: usize,
    failed: Vec<(String, CliError)>,
}

impl ConvertArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            map: self.map,
            output_dir: self.output_dir,
            delivery_target: self.delivery_target,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let rules = config.rules.build();
        let missing = rules.missing_processors();
        if !missing.is_empty() {
            return Err(CliError::Validation(format!(
                "unknown tag processors: {}",
                missing.join(", ")
            )));
        }
        let options = config.conversion_options();

        let map = &config.convert_resolved.map;
        let output_dir = &config.convert_resolved.output_dir;
        let (root, map_name) = split_map_path(map)?;

        output.field("Map", &map.display().to_string());
        output.field("Output", &output_dir.display().to_string());

        let mut index = DocumentIndex::new(Arc::new(FsStorage::new(root)))
            .with_audience(options.audience.clone());
        index.load_map(&map_name)?;

        let index_diagnostics = index.diagnostics();
        if !index_diagnostics.is_empty() {
            output.heading(&format!("{} map diagnostics", index_diagnostics.len()));
            for diagnostic in index_diagnostics {
                output.diagnostic(diagnostic);
            }
        }

        let summary = convert_site(&index, &rules, &options, output_dir)?;

        if summary.failed.is_empty() {
            output.success(&format!(
                "Wrote {} pages to {} ({} diagnostics)",
                summary.written,
                output_dir.display(),
                summary.diagnostics
            ));
            return Ok(());
        }

        for (path, err) in &summary.failed {
            output.error(&format!("{path}: {err}"));
        }
        output.warning(&format!(
            "Wrote {} pages, {} failed",
            summary.written,
            summary.failed.len()
        ));

        // Failed topics only abort the run when reuse errors are fatal.
        if config.convert_resolved.resolution_policy == PolicySetting::Abort
            && let Some((_, err)) = summary.failed.into_iter().next()
        {
            return Err(err);
        }
        Ok(())
    }
}

/// Storage root and root-relative map name for a map file path.
fn split_map_path(map: &Path) -> Result<(PathBuf, String), CliError> {
    let name = map
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::Validation(format!("invalid map path: {}", map.display())))?;
    let root = map
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok((root.to_path_buf(), name.to_owned()))
}

/// Write the TOC page and one page per loaded topic.
///
/// Topics are converted in parallel; the index is read-only here.
fn convert_site(
    index: &DocumentIndex,
    rules: &Rules,
    options: &ConversionOptions,
    output_dir: &Path,
) -> Result<Summary, CliError> {
    let start = Instant::now();
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(output_dir.join(TOC_FILE), render_toc_page(index))?;

    let topics: Vec<TopicId> = index
        .topics()
        .filter(|(_, topic)| !topic.is_placeholder())
        .map(|(id, _)| id)
        .collect();

    let results: Vec<TopicResult> = topics
        .par_iter()
        .map(|&id| TopicResult {
            path: index.topic(id).path.clone(),
            result: write_topic(index, rules, options, output_dir, id),
        })
        .collect();

    let mut summary = Summary::default();
    for TopicResult { path, result } in results {
        match result {
            Ok(diagnostics) => {
                summary.written += 1;
                summary.diagnostics += diagnostics.len();
                for diagnostic in &diagnostics {
                    tracing::warn!(topic = %path, "{diagnostic}");
                }
            }
            Err(err) => summary.failed.push((path, err)),
        }
    }

    tracing::info!(
        topics = topics.len(),
        written = summary.written,
        failed = summary.failed.len(),
        elapsed_ms = elapsed_ms(start),
        "Converted topics"
    );
    Ok(summary)
}

fn write_topic(
    index: &DocumentIndex,
    rules: &Rules,
    options: &ConversionOptions,
    output_dir: &Path,
    id: TopicId,
) -> Result<Vec<Diagnostic>, CliError> {
    let topic = index.topic(id);
    let output = convert_topic(index, rules, options, id).inspect_err(|err| {
        if let PageError::Convert {
            path, diagnostics, ..
        } = err
        {
            for diagnostic in diagnostics {
                tracing::warn!(topic = %path, "{diagnostic}");
            }
        }
    })?;

    let target = output_dir.join(html_path(&topic.path));
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&target, render_page(index, id, &output.content))?;
    tracing::debug!(path = %target.display(), "Wrote page");

    Ok(output.diagnostics)
}

/// Convert Duration to milliseconds as f64.
fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
