//! Files written by a run.
//!
//! Layout of `results_dir`:
//!
//! ```text
//! <signal>_alphas.parquet   alpha table (or .csv)
//! ics.csv                   daily, rolling and cumulative ICs
//! rank_ic_chart.csv         cumulative rank IC series with title
//! pearson_ic_chart.csv      cumulative Pearson IC series with title
//! report.json               configuration, IC statistics, paths, backtest
//! ```

use crate::{ExperimentConfig, PipelineOutput, Result};
use hobart_backtest::DispatchReport;
use hobart_eval::IcMethod;
use hobart_output::{
    ChartRenderer, ExportFormat, Exporter, IcChart, ReportBuilder, alpha_file_name, ic_records,
    write_frame,
};
use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// File name of the IC table.
pub const IC_FILE: &str = "ics.csv";

/// File name of the run report.
pub const REPORT_FILE: &str = "report.json";

/// Paths of the tables and charts of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// Alpha table
    pub alphas: PathBuf,
    /// IC table
    pub ics: PathBuf,
    /// Cumulative rank IC chart
    pub rank_chart: PathBuf,
    /// Cumulative Pearson IC chart
    pub pearson_chart: PathBuf,
}

/// Write the alpha table, the IC table and both IC charts.
pub fn write_artifacts(
    config: &ExperimentConfig,
    output: &mut PipelineOutput,
    renderer: &dyn ChartRenderer,
) -> Result<ArtifactPaths> {
    let dir = &config.output.results_dir;
    std::fs::create_dir_all(dir)?;

    let format = config.output.alpha_format;
    let alphas = write_frame(
        &mut output.alphas,
        &dir.join(alpha_file_name(config.name(), format)),
        format,
    )?;

    let ics = dir.join(IC_FILE);
    ic_records(&output.ics)?.export_to_file(&ics, ExportFormat::Csv)?;

    let rank_chart = renderer.render(
        &IcChart::cumulative(config.title(), IcMethod::Rank, &output.ics.series),
        dir,
    )?;
    let pearson_chart = renderer.render(
        &IcChart::cumulative(config.title(), IcMethod::Pearson, &output.ics.series),
        dir,
    )?;

    info!(dir = %dir.display(), "Wrote artifacts");
    Ok(ArtifactPaths {
        alphas,
        ics,
        rank_chart,
        pearson_chart,
    })
}

/// Write the JSON run report.
pub fn write_report(
    config: &ExperimentConfig,
    output: &PipelineOutput,
    paths: &ArtifactPaths,
    backtest: Option<&DispatchReport>,
) -> Result<PathBuf> {
    let panel = json!({
        "rows": output.panel_rows,
        "entities": output.entities,
        "signal_rows": output.signals.height(),
        "alpha_rows": output.alphas.height(),
    });
    let report = ReportBuilder::new()
        .signal(config.name())
        .title(config.title())
        .period(config.data.start, config.data.end)
        .section("config", config)?
        .section("panel", &panel)?
        .section("ic", &output.ics)?
        .section("artifacts", paths)?
        .section("backtest", &backtest)?
        .build()?;

    let path = config.output.results_dir.join(REPORT_FILE);
    report.write(&path)?;
    Ok(path)
}

/// Write a factor-beta table next to the other artifacts.
pub fn write_betas(config: &ExperimentConfig, betas: &mut DataFrame) -> Result<PathBuf> {
    let format = config.output.alpha_format;
    let path = config
        .output
        .results_dir
        .join(format!("{}_betas.{}", config.name(), format.extension()));
    Ok(write_frame(betas, &path, format)?)
}
