//! Hobart CLI binary.
//!
//! Runs momentum alpha experiments from TOML files or built-in presets.

mod setup;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use hobart::backtest::{DispatchConfig, DispatchReport, SlurmSettings};
use hobart::eval::IcMethod;
use hobart::output::DataFileRenderer;
use hobart::signals::available_signals;
use hobart::{
    BacktestLauncher, ExperimentConfig, Overrides, Pipeline, PipelineOutput, Stage,
    write_artifacts, write_betas, write_report,
};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::DataFrame;
use setup::{LogFormat, init_logging, load_environment};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: factor-residual momentum alphas", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build alphas, evaluate ICs, write artifacts and dispatch backtests
    Run {
        #[command(flatten)]
        experiment: ExperimentArgs,

        /// Override the configured backtest dispatch
        #[arg(long, value_enum)]
        dispatch: Option<DispatchMode>,

        /// Plan backtests and write scripts without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Export rolling regression coefficients
    Betas {
        #[command(flatten)]
        experiment: ExperimentArgs,
    },

    /// List built-in experiments
    Presets,

    /// Print the resolved experiment as TOML
    Show {
        #[command(flatten)]
        experiment: ExperimentArgs,
    },

    /// Check an experiment without loading data
    Validate {
        #[command(flatten)]
        experiment: ExperimentArgs,
    },
}

#[derive(Args)]
struct ExperimentArgs {
    /// Experiment TOML file
    #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
    config: Option<PathBuf>,

    /// Built-in experiment name
    #[arg(long)]
    preset: Option<String>,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Asset panel file
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Factor return file
    #[arg(long)]
    factors: Option<PathBuf>,

    /// Artifact directory
    #[arg(long)]
    results_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DispatchMode {
    None,
    Local,
    Slurm,
}

impl ExperimentArgs {
    /// Load the file or preset and apply command-line overrides.
    fn resolve(
        self,
        dispatch: Option<DispatchMode>,
    ) -> Result<ExperimentConfig, Box<dyn std::error::Error>> {
        let mut config = match (&self.config, &self.preset) {
            (Some(path), _) => ExperimentConfig::from_file(path)?,
            (None, Some(name)) => ExperimentConfig::preset(name)?,
            (None, None) => return Err("either --config or --preset is required".into()),
        };

        let dispatch = dispatch.map(|mode| match mode {
            DispatchMode::None => DispatchConfig::None,
            DispatchMode::Local if config.backtest.dispatch.kind() == "local" => {
                config.backtest.dispatch.clone()
            }
            DispatchMode::Local => DispatchConfig::default(),
            DispatchMode::Slurm if config.backtest.dispatch.kind() == "slurm" => {
                config.backtest.dispatch.clone()
            }
            DispatchMode::Slurm => DispatchConfig::Slurm(SlurmSettings::default()),
        });

        config.apply(Overrides {
            start: self.start,
            end: self.end,
            assets: self.assets,
            factors: self.factors,
            results_dir: self.results_dir,
            dispatch,
        });
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            experiment,
            dispatch,
            dry_run,
        } => {
            let config = experiment.resolve(dispatch)?;
            run_experiment(&config, dry_run)?;
        }
        Commands::Betas { experiment } => {
            let config = experiment.resolve(None)?;
            export_betas(&config)?;
        }
        Commands::Presets => list_presets(),
        Commands::Show { experiment } => {
            let config = experiment.resolve(None)?;
            print!("{}", config.to_toml_string()?);
        }
        Commands::Validate { experiment } => {
            let config = experiment.resolve(None)?;
            println!("✓ {} is valid", config.name());
            println!(
                "  Signal needs {} dates of history per entity",
                config.signal.min_history()
            );
        }
    }

    Ok(())
}

fn progress_bar(len: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn run_experiment(
    config: &ExperimentConfig,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", config.title());
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("Period: {} to {}", config.data.start, config.data.end);
    println!(
        "Signal: window {}, lag {}, min history {}\n",
        config.signal.window,
        config.signal.lag,
        config.signal.min_history()
    );

    info!(
        signal = config.name(),
        results_dir = %config.output.results_dir.display(),
        "Starting experiment"
    );
    let pipeline = Pipeline::new(config.clone())?;
    let pb = progress_bar(Stage::ALL.len() as u64)?;
    let result = pipeline.run_with(&config.data.source(), |stage| {
        let position = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0);
        pb.set_position(position as u64);
        pb.set_message(format!("{stage}..."));
    });
    let mut output = match result {
        Ok(output) => {
            pb.set_position(Stage::ALL.len() as u64);
            pb.finish_with_message(format!(
                "{} alphas over {} entities",
                output.alphas.height(),
                output.entities
            ));
            output
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            return Err(e.into());
        }
    };

    print_ic_summary(&output);

    let paths = write_artifacts(config, &mut output, &DataFileRenderer::default())?;

    let launcher = BacktestLauncher::new(load_environment()).dry_run(dry_run);
    let backtest_bar = progress_bar(0)?;
    let bar = backtest_bar.clone();
    let launcher = launcher.with_progress(move |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        bar.set_message("backtests");
    });
    let backtest = launcher.launch(config, &output.alphas, &paths.alphas)?;
    backtest_bar.finish_and_clear();
    print_backtest(backtest.as_ref());

    let report = write_report(config, &output, &paths, backtest.as_ref())?;

    println!("\nArtifacts:");
    println!("  {}", paths.alphas.display());
    println!("  {}", paths.ics.display());
    println!("  {}", paths.rank_chart.display());
    println!("  {}", paths.pearson_chart.display());
    println!("  {}", report.display());
    Ok(())
}

fn print_ic_summary(output: &PipelineOutput) {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("INFORMATION COEFFICIENT");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    println!(
        "{:<10}{:>10}{:>10}{:>8}{:>10}{:>9}{:>8}",
        "", "Mean", "Std", "IR", "Hit Rate", "t-stat", "Dates"
    );
    println!("─────────────────────────────────────────────────────────────");
    for method in IcMethod::all() {
        let s = output.ics.summary(method);
        println!(
            "{:<10}{:>10.4}{:>10.4}{:>8.3}{:>9.1}%{:>9.2}{:>8}",
            method.to_string(),
            s.mean,
            s.std,
            s.ir,
            s.hit_rate * 100.0,
            s.t_stat,
            s.count
        );
    }
    println!("\nPairs evaluated: {}", output.ics.pairs);
}

fn print_backtest(report: Option<&DispatchReport>) {
    match report {
        None => println!("\nBacktest: skipped"),
        Some(DispatchReport::Local(local)) => {
            println!(
                "\nBacktest: {} of {} yearly jobs succeeded",
                local.outcomes.len(),
                local.jobs()
            );
            for failure in &local.failures {
                println!("  ✗ {}: {}", failure.year, failure.error);
            }
        }
        Some(DispatchReport::Slurm(submission)) if submission.submitted => println!(
            "\nBacktest: submitted {} jobs as {} ({})",
            submission.jobs,
            submission.scheduler_id.as_deref().unwrap_or("unknown id"),
            submission.script.display()
        ),
        Some(DispatchReport::Slurm(submission)) => println!(
            "\nBacktest: dry run, script written to {}",
            submission.script.display()
        ),
    }
}

fn export_betas(config: &ExperimentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config.clone())?;
    let panel = pipeline.load(&config.data.source())?;
    let mut betas = pipeline.betas(&panel)?;

    println!("\nMean rolling coefficients:");
    println!("─────────────────────────────────────────────────────────────");
    for (column, mean) in coefficient_means(&betas) {
        match mean {
            Some(mean) => println!("  {:<15} {:>10.5}", column, mean),
            None => println!("  {:<15} {:>10}", column, "n/a"),
        }
    }

    let path = write_betas(config, &mut betas)?;
    println!("\nWrote {}", path.display());
    Ok(())
}

/// Mean of every coefficient column, skipping the `date` and `entity_id` keys.
fn coefficient_means(betas: &DataFrame) -> Vec<(String, Option<f64>)> {
    betas
        .get_columns()
        .iter()
        .skip(2)
        .map(|column| {
            let mean = column.as_materialized_series().mean();
            (column.name().to_string(), mean)
        })
        .collect()
}

fn list_presets() {
    println!("\nBuilt-in experiments:");
    println!("─────────────────────────────────────────────────────────────");
    for info in available_signals() {
        println!("  {:<26} {}", info.name, info.title);
        println!("  {:<26} {}", "", info.description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_coefficient_means_skip_keys() {
        let betas = df![
            "date" => ["2020-01-02", "2020-01-02", "2020-01-03"],
            "entity_id" => ["A", "B", "A"],
            "B_const" => [Some(0.001), Some(0.003), None],
            "B_mkt_rf" => [Some(0.9), Some(1.1), Some(1.3)],
            "B_smb" => [None::<f64>, None, None],
        ]
        .unwrap();

        let means = coefficient_means(&betas);
        let names: Vec<&str> = means.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["B_const", "B_mkt_rf", "B_smb"]);
        assert!((means[0].1.unwrap() - 0.002).abs() < 1e-12);
        assert!((means[1].1.unwrap() - 1.1).abs() < 1e-12);
        assert_eq!(means[2].1, None);
    }
}
