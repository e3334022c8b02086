//! Slurm array-job dispatch.
//!
//! Each array task picks its year from a table baked into the script and
//! runs the configured worker against the persisted alpha file.

use crate::dispatch::{DispatchReport, Dispatcher, SlurmSubmission};
use crate::{
    AlphaSource, BacktestEnvironment, BacktestError, BacktestJob, Result, SlurmSettings,
};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Writes and submits `sbatch` array scripts.
#[derive(Debug, Clone)]
pub struct SlurmDispatcher {
    settings: SlurmSettings,
    environment: BacktestEnvironment,
    script_dir: PathBuf,
    dry_run: bool,
}

impl SlurmDispatcher {
    /// Dispatcher writing scripts and job logs under `script_dir`.
    pub fn new(
        settings: SlurmSettings,
        environment: BacktestEnvironment,
        script_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            environment,
            script_dir: script_dir.into(),
            dry_run: false,
        }
    }

    /// Only write the script.
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Path the script for `signal` is written to.
    pub fn script_path(&self, signal: &str) -> PathBuf {
        self.script_dir.join(format!("{signal}_backtest.sbatch"))
    }

    /// Render the array script for `jobs` over `data`.
    ///
    /// All jobs must belong to one signal and share gamma and constraints,
    /// which is what [`plan_jobs`](crate::plan_jobs) produces. Relative
    /// `data` and log paths are resolved against the current directory,
    /// since tasks run from the project root.
    pub fn render_script(&self, jobs: &[BacktestJob], data: &Path) -> Result<String> {
        let Some(first) = jobs.first() else {
            return Err(BacktestError::NoJobs);
        };
        let settings = &self.settings;
        let data = std::path::absolute(data)?;
        let logs = std::path::absolute(self.script_dir.join("logs"))?;
        let constraints = first
            .constraints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let years = jobs
            .iter()
            .map(|job| job.year.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let mut script = String::from("#!/bin/bash\n");
        script.push_str(&format!("#SBATCH --job-name={}_backtest\n", first.signal));
        script.push_str(&format!(
            "#SBATCH --array=0-{}%{}\n",
            jobs.len() - 1,
            settings.max_concurrent_jobs
        ));
        script.push_str(&format!("#SBATCH --cpus-per-task={}\n", settings.n_cpus));
        script.push_str(&format!("#SBATCH --mem={}\n", settings.mem));
        script.push_str(&format!("#SBATCH --time={}\n", settings.time));
        if let Some(email) = &self.environment.notify_email {
            script.push_str(&format!("#SBATCH --mail-type={}\n", settings.mail_type));
            script.push_str(&format!("#SBATCH --mail-user={email}\n"));
        }
        script.push_str(&format!(
            "#SBATCH --output={}/{}_%A_%a.out\n",
            logs.display(),
            first.signal
        ));

        script.push_str("\nset -euo pipefail\n\n");
        if let Some(root) = &self.environment.project_root {
            script.push_str(&format!("cd {}\n", shell_quote(&root.display().to_string())));
        }
        script.push_str(&format!("YEARS=({years})\n"));
        script.push_str("YEAR=${YEARS[$SLURM_ARRAY_TASK_ID]}\n\n");
        script.push_str(&format!(
            "{} --signal {} --data {} --year \"$YEAR\" --gamma {} --constraints {} --n-cpus {}\n",
            settings.worker,
            first.signal,
            shell_quote(&data.display().to_string()),
            first.gamma,
            constraints,
            settings.n_cpus
        ));
        Ok(script)
    }

    fn submit(&self, script: &Path) -> Result<Option<String>> {
        let output = Command::new("sbatch").arg(script).output()?;
        if !output.status.success() {
            return Err(BacktestError::Submission(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(output = %stdout.trim(), "sbatch accepted the job");
        Ok(parse_job_id(&stdout))
    }
}

/// Single-quote `value` for bash.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Job id from `Submitted batch job <id>`.
fn parse_job_id(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Submitted batch job "))
        .map(|id| id.trim().to_string())
}

impl Dispatcher for SlurmDispatcher {
    fn dispatch(&self, jobs: &[BacktestJob], source: &AlphaSource) -> Result<DispatchReport> {
        let Some(data) = source.path() else {
            return Err(BacktestError::InvalidSource(
                "cluster jobs need a persisted alpha file".to_string(),
            ));
        };
        let Some(signal) = jobs.first().map(|job| job.signal.as_str()) else {
            return Err(BacktestError::NoJobs);
        };

        let script = self.render_script(jobs, data)?;
        std::fs::create_dir_all(self.script_dir.join("logs"))?;
        let path = self.script_path(signal);
        std::fs::write(&path, script)?;

        let scheduler_id = if self.dry_run {
            info!(script = %path.display(), jobs = jobs.len(), "Dry run, not submitting");
            None
        } else {
            let id = self.submit(&path)?;
            info!(
                script = %path.display(),
                jobs = jobs.len(),
                job_id = id.as_deref().unwrap_or("unknown"),
                "Submitted array job"
            );
            id
        };

        Ok(DispatchReport::Slurm(SlurmSubmission {
            script: path,
            jobs: jobs.len(),
            submitted: !self.dry_run,
            scheduler_id,
        }))
    }
}
