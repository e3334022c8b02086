//! Experiment configuration.
//!
//! An experiment is a TOML document naming the signal and every parameter
//! of the run. Sections other than `[experiment]` and `[signal]` may be
//! omitted and take their defaults.

use crate::{PipelineError, Result};
use chrono::NaiveDate;
use hobart_backtest::{BacktestConfig, DispatchConfig, SlurmSettings};
use hobart_data::{FileSource, PrepareOptions};
use hobart_output::ExportFormat;
use hobart_signals::{AlphaConfig, SignalConfig, preset, signal_info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1996, 6, 1).unwrap_or_default()
}

fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default()
}

fn default_assets() -> PathBuf {
    PathBuf::from("data/assets.parquet")
}

fn default_factors() -> PathBuf {
    PathBuf::from("data/factors.parquet")
}

const fn default_ic_window() -> usize {
    22
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

const fn default_alpha_format() -> ExportFormat {
    ExportFormat::Parquet
}

/// Signal identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    /// Signal name; names artifacts and backtest jobs
    pub name: String,
    /// Chart title prefix; defaults to the name
    #[serde(default)]
    pub title: Option<String>,
}

/// Input range and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    /// First date loaded (default: 1996-06-01)
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    /// Last date loaded (default: 2024-12-31)
    #[serde(default = "default_end")]
    pub end: NaiveDate,
    /// Asset panel file, Parquet or CSV
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
    /// Factor return file, Parquet or CSV
    #[serde(default = "default_factors")]
    pub factors: PathBuf,
    /// Whether factor returns are quoted in percent
    #[serde(default)]
    pub factors_in_percent: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: default_end(),
            assets: default_assets(),
            factors: default_factors(),
            factors_in_percent: false,
        }
    }
}

impl DataConfig {
    /// File-backed source for the configured paths.
    pub fn source(&self) -> FileSource {
        FileSource::new(&self.assets, &self.factors)
    }
}

/// IC evaluation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Rolling IC window in valid dates (default: 22)
    #[serde(default = "default_ic_window")]
    pub ic_window: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            ic_window: default_ic_window(),
        }
    }
}

/// Artifact location and format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every artifact (default: "results")
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Alpha table format, parquet or csv (default: parquet)
    #[serde(default = "default_alpha_format")]
    pub alpha_format: ExportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            alpha_format: default_alpha_format(),
        }
    }
}

/// A complete experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Signal identity
    pub experiment: ExperimentInfo,
    /// Inputs
    #[serde(default)]
    pub data: DataConfig,
    /// Signal definition
    pub signal: SignalConfig,
    /// Universe floor and IC scalar
    #[serde(default)]
    pub alpha: AlphaConfig,
    /// IC evaluation
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Artifacts
    #[serde(default)]
    pub output: OutputConfig,
    /// Backtest hand-off
    #[serde(default)]
    pub backtest: BacktestConfig,
}

/// Values given on the command line, applied over a file or preset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces `data.start`
    pub start: Option<NaiveDate>,
    /// Replaces `data.end`
    pub end: Option<NaiveDate>,
    /// Replaces `data.assets`
    pub assets: Option<PathBuf>,
    /// Replaces `data.factors`
    pub factors: Option<PathBuf>,
    /// Replaces `output.results_dir`
    pub results_dir: Option<PathBuf>,
    /// Replaces `backtest.dispatch`
    pub dispatch: Option<DispatchConfig>,
}

impl ExperimentConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Built-in experiment for a registered signal.
    ///
    /// The vol-scaled five-factor experiment was run on the cluster; every
    /// other preset runs its backtests locally.
    pub fn preset(name: &str) -> Result<Self> {
        let (Some(info), Some(signal)) = (signal_info(name), preset(name)) else {
            return Err(PipelineError::UnknownPreset(name.to_string()));
        };

        let dispatch = if name == "vol_scaled_ff5_momentum" {
            DispatchConfig::Slurm(SlurmSettings::default())
        } else {
            DispatchConfig::default()
        };

        Ok(Self {
            experiment: ExperimentInfo {
                name: info.name.to_string(),
                title: Some(info.title.to_string()),
            },
            data: DataConfig::default(),
            signal,
            alpha: AlphaConfig::default(),
            evaluation: EvaluationConfig::default(),
            output: OutputConfig {
                results_dir: default_results_dir().join(info.name),
                alpha_format: default_alpha_format(),
            },
            backtest: BacktestConfig {
                dispatch,
                ..BacktestConfig::default()
            },
        })
    }

    /// Serialise back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Signal name.
    pub fn name(&self) -> &str {
        &self.experiment.name
    }

    /// Display title, falling back to the name.
    pub fn title(&self) -> &str {
        self.experiment
            .title
            .as_deref()
            .unwrap_or(&self.experiment.name)
    }

    /// Panel preparation options for this experiment.
    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions::new(self.data.start, self.data.end)
            .with_factors(self.signal.source.factors().iter().copied())
            .factors_in_percent(self.data.factors_in_percent)
    }

    /// Apply command-line values.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(start) = overrides.start {
            self.data.start = start;
        }
        if let Some(end) = overrides.end {
            self.data.end = end;
        }
        if let Some(assets) = overrides.assets {
            self.data.assets = assets;
        }
        if let Some(factors) = overrides.factors {
            self.data.factors = factors;
        }
        if let Some(results_dir) = overrides.results_dir {
            self.output.results_dir = results_dir;
        }
        if let Some(dispatch) = overrides.dispatch {
            self.backtest.dispatch = dispatch;
        }
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        let name = &self.experiment.name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(PipelineError::InvalidConfig(format!(
                "experiment name '{name}' must be non-empty ASCII letters, digits, '_' or '-'"
            )));
        }
        if self.data.start > self.data.end {
            return Err(hobart_data::DataError::InvalidDateRange {
                start: self.data.start.to_string(),
                end: self.data.end.to_string(),
            }
            .into());
        }
        if self.evaluation.ic_window == 0 {
            return Err(hobart_eval::EvalError::InvalidWindow(0).into());
        }
        if !matches!(
            self.output.alpha_format,
            ExportFormat::Parquet | ExportFormat::Csv
        ) {
            return Err(PipelineError::InvalidConfig(
                "alpha_format must be parquet or csv".to_string(),
            ));
        }
        self.signal.validate()?;
        self.alpha.validate()?;
        self.backtest.validate()?;
        Ok(())
    }
}

/// Names of the built-in experiments.
pub fn preset_names() -> Vec<&'static str> {
    hobart_signals::available_signals()
        .into_iter()
        .map(|info| info.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hobart_backtest::Constraint;
    use hobart_data::FactorColumn;
    use hobart_signals::SignalSource;
    use rstest::rstest;

    const FF3: &str = r#"
[experiment]
name = "ff3_momentum"
title = "Fama French 3 Idio. Momentum"

[data]
start = "1996-06-01"
end = "2024-12-31"
assets = "data/assets.parquet"
factors = "data/fama_french.parquet"

[signal]
source = { kind = "factor_residual", factors = ["mkt_rf", "smb", "hml"], window = 252, min_periods = 252 }
window = 230
lag = 21

[alpha]
price_floor = 5.0
information_coefficient = 0.05

[evaluation]
ic_window = 22

[output]
results_dir = "results/ff3_momentum"
alpha_format = "parquet"

[backtest]
gamma = 60.0
constraints = ["ZeroBeta", "ZeroInvestment"]
dispatch = { kind = "local", n_cpus = 8 }
"#;

    #[test]
    fn test_parse_full_document() {
        let config = ExperimentConfig::from_toml_str(FF3).unwrap();
        assert_eq!(config.name(), "ff3_momentum");
        assert_eq!(config.title(), "Fama French 3 Idio. Momentum");
        assert_eq!(
            config.signal.source.factors(),
            &[FactorColumn::MktRf, FactorColumn::Smb, FactorColumn::Hml]
        );
        assert_eq!(config.data.factors, PathBuf::from("data/fama_french.parquet"));
        assert_eq!(
            config.backtest.constraints,
            vec![Constraint::ZeroBeta, Constraint::ZeroInvestment]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
[experiment]
name = "momentum"

[signal]
source = { kind = "return" }
"#,
        )
        .unwrap();
        assert_eq!(config.title(), "momentum");
        assert_eq!(config.signal.window, 230);
        assert_eq!(config.signal.lag, 21);
        assert_eq!(config.alpha.price_floor, 5.0);
        assert_eq!(config.evaluation.ic_window, 22);
        assert_eq!(config.output.alpha_format, ExportFormat::Parquet);
        assert_eq!(config.data.start, NaiveDate::from_ymd_opt(1996, 6, 1).unwrap());
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case("momentum")]
    #[case("vol_scaled_momentum")]
    #[case("barra_momentum")]
    #[case("capm_momentum")]
    #[case("ff3_momentum")]
    #[case("vol_scaled_ff5_momentum")]
    fn test_presets_validate_and_survive_toml(#[case] name: &str) {
        let config = ExperimentConfig::preset(name).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.results_dir, PathBuf::from("results").join(name));

        let text = config.to_toml_string().unwrap();
        let back = ExperimentConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[rstest]
    #[case("momentum", include_str!("../../../experiments/momentum.toml"))]
    #[case("vol_scaled_momentum", include_str!("../../../experiments/vol_scaled_momentum.toml"))]
    #[case("barra_momentum", include_str!("../../../experiments/barra_momentum.toml"))]
    #[case("capm_momentum", include_str!("../../../experiments/capm_momentum.toml"))]
    #[case("ff3_momentum", include_str!("../../../experiments/ff3_momentum.toml"))]
    #[case(
        "vol_scaled_ff5_momentum",
        include_str!("../../../experiments/vol_scaled_ff5_momentum.toml")
    )]
    fn test_experiment_files_match_presets(#[case] name: &str, #[case] text: &str) {
        let file = ExperimentConfig::from_toml_str(text).unwrap();
        assert_eq!(file, ExperimentConfig::preset(name).unwrap());
    }

    #[test]
    fn test_preset_dispatch() {
        let ff5 = ExperimentConfig::preset("vol_scaled_ff5_momentum").unwrap();
        assert_eq!(ff5.backtest.dispatch.kind(), "slurm");
        let capm = ExperimentConfig::preset("capm_momentum").unwrap();
        assert_eq!(capm.backtest.dispatch.kind(), "local");
        assert_eq!(capm.signal.window, 232);
        assert!(matches!(capm.signal.source, SignalSource::FactorResidual(_)));

        assert!(matches!(
            ExperimentConfig::preset("reversal"),
            Err(PipelineError::UnknownPreset(_))
        ));
        assert_eq!(preset_names().len(), 6);
    }

    #[test]
    fn test_overrides() {
        let mut config = ExperimentConfig::preset("momentum").unwrap();
        config.apply(Overrides {
            start: NaiveDate::from_ymd_opt(2010, 1, 1),
            assets: Some(PathBuf::from("extract/assets.csv")),
            dispatch: Some(DispatchConfig::None),
            ..Default::default()
        });
        assert_eq!(config.data.start, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(config.data.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(config.data.assets, PathBuf::from("extract/assets.csv"));
        assert_eq!(config.backtest.dispatch, DispatchConfig::None);
    }

    #[test]
    fn test_invalid_configurations() {
        let mut reversed = ExperimentConfig::preset("momentum").unwrap();
        reversed.data.start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert!(matches!(reversed.validate(), Err(PipelineError::Data(_))));

        let mut bad_name = ExperimentConfig::preset("momentum").unwrap();
        bad_name.experiment.name = "mom/../x".to_string();
        assert!(matches!(bad_name.validate(), Err(PipelineError::InvalidConfig(_))));

        let mut json_alphas = ExperimentConfig::preset("momentum").unwrap();
        json_alphas.output.alpha_format = ExportFormat::Json;
        assert!(json_alphas.validate().is_err());

        let mut zero_ic = ExperimentConfig::preset("momentum").unwrap();
        zero_ic.alpha.information_coefficient = 0.0;
        assert!(matches!(zero_ic.validate(), Err(PipelineError::Signal(_))));

        let mut bad_gamma = ExperimentConfig::preset("momentum").unwrap();
        bad_gamma.backtest.gamma = -60.0;
        assert!(matches!(bad_gamma.validate(), Err(PipelineError::Backtest(_))));

        let mut no_window = ExperimentConfig::preset("momentum").unwrap();
        no_window.evaluation.ic_window = 0;
        assert!(matches!(no_window.validate(), Err(PipelineError::Eval(_))));
    }

    #[test]
    fn test_malformed_document() {
        let result = ExperimentConfig::from_toml_str("[experiment]\nname = 3\n");
        assert!(matches!(result, Err(PipelineError::TomlParse(_))));
    }
}
