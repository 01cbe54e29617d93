//! Subcommand implementations

use crate::config::{DetectorConfig, SourceKind};
use crate::output::{self, HistoryRow, OutputFormat};
use anyhow::{Context, Result};
use detector_lib::collector::{ExpositionSource, PrometheusSource, SampleSource, SyntheticSource};
use detector_lib::history::HistoryStore;
use detector_lib::{
    read_score, AnomalyEngine, CycleLogger, CycleOutcome, ScoreSlot, TrackedMetric, Verdict,
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct RunOutput {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    anomaly_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scored_rows: Option<usize>,
    history_len: usize,
    missing: Vec<TrackedMetric>,
    metrics: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ScoreOutput {
    anomaly_score: f64,
    verdict: Verdict,
    path: String,
}

fn build_engine(config: &DetectorConfig) -> Result<AnomalyEngine> {
    let engine = AnomalyEngine::new(
        config.engine.clone(),
        HistoryStore::new(&config.history_file),
        ScoreSlot::new(&config.score_file, config.engine.score_precision),
        CycleLogger::new(&config.host),
    )?;
    Ok(engine)
}

fn build_source(config: &DetectorConfig) -> Result<Box<dyn SampleSource>> {
    let source: Box<dyn SampleSource> = match config.source {
        SourceKind::Prometheus => Box::new(
            PrometheusSource::new(&config.prometheus_url, config.timeout())
                .context("Failed to create Prometheus source")?,
        ),
        SourceKind::Exposition => Box::new(
            ExpositionSource::new(&config.metrics_url, config.timeout())
                .context("Failed to create exporter source")?,
        ),
        SourceKind::Synthetic => Box::new(SyntheticSource::new(
            config.synthetic_seed(),
            config.synthetic_anomaly_rate,
        )),
    };
    Ok(source)
}

/// Acquire one sample and run one detection cycle
pub async fn run(config: &DetectorConfig, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config)?;
    let source = build_source(config)?;

    info!(event = "acquisition_started", source = source.name(), "Acquiring sample");
    let sample = source.get_sample().await;
    let metrics = sample.to_json();

    let outcome = engine
        .run_cycle(sample)
        .with_context(|| format!("Detection cycle failed for {}", config.history_file.display()))?;

    match outcome {
        CycleOutcome::Skipped { missing } => {
            let history_len = engine.load_history()?.len();
            match format {
                OutputFormat::Table => {
                    let names: Vec<&str> = missing.iter().map(|m| m.name()).collect();
                    output::print_warning(&format!(
                        "Skipped cycle: unresolved metrics {}",
                        names.join(", ")
                    ));
                }
                OutputFormat::Json => output::print_json(&RunOutput {
                    status: "skipped",
                    anomaly_score: None,
                    verdict: None,
                    scored_rows: None,
                    history_len,
                    missing,
                    metrics,
                }),
            }
        }
        CycleOutcome::Completed(report) => match format {
            OutputFormat::Table => {
                let score = output::color_score(&report.published, report.verdict);
                let line = format!(
                    "anomaly score {} ({}, {} rows scored, {} in history)",
                    score, report.verdict, report.breakdown.rows, report.history_len
                );
                if report.verdict.is_anomalous() {
                    output::print_warning(&line);
                } else {
                    output::print_success(&line);
                }
            }
            OutputFormat::Json => output::print_json(&RunOutput {
                status: "completed",
                anomaly_score: Some(report.published),
                verdict: Some(report.verdict),
                scored_rows: Some(report.breakdown.rows),
                history_len: report.history_len,
                missing: Vec::new(),
                metrics,
            }),
        },
    }

    Ok(())
}

/// Append a synthetic series to the history without scoring
pub fn generate(config: &DetectorConfig, iterations: usize, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config)?;
    let samples = SyntheticSource::series(iterations, config.synthetic_seed());

    let summary = engine
        .append_samples(samples)
        .context("Failed to append generated samples")?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Generated {} samples ({} in history)",
                summary.appended, summary.history_len
            ));
            if summary.rejected > 0 {
                output::print_warning(&format!("{} samples rejected", summary.rejected));
            }
        }
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "appended": summary.appended,
            "rejected": summary.rejected,
            "history_len": summary.history_len,
        })),
    }

    Ok(())
}

/// Print the newest `limit` history rows
pub fn history(config: &DetectorConfig, limit: usize, format: OutputFormat) -> Result<()> {
    let engine = build_engine(config)?;
    let window = engine.load_history().context("Failed to load history")?;

    let rows: Vec<HistoryRow> = window.tail(limit).into_iter().map(HistoryRow::from).collect();
    output::print_table(&rows, format);

    if format == OutputFormat::Table && !rows.is_empty() {
        output::print_info(&format!(
            "Showing {} of {} samples ({} complete)",
            rows.len(),
            window.len(),
            window.complete_count()
        ));
    }

    Ok(())
}

/// Print the published score
pub fn score(config: &DetectorConfig, format: OutputFormat) -> Result<()> {
    let value = read_score(&config.score_file);
    let verdict = Verdict::classify(value, config.engine.anomaly_threshold);

    match format {
        OutputFormat::Table => {
            let slot = ScoreSlot::new(&config.score_file, config.engine.score_precision);
            let rendered = output::color_score(&slot.render(value), verdict);
            output::print_info(&format!("anomaly score {} ({})", rendered, verdict));
        }
        OutputFormat::Json => output::print_json(&ScoreOutput {
            anomaly_score: value,
            verdict,
            path: config.score_file.display().to_string(),
        }),
    }

    Ok(())
}
