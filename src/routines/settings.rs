use crate::algorithms::Algorithm;
use crate::routines::optimization::{ABSTOL, MAX_BACKTRACKS, MAX_ITER, MIN_STEP_SIZE};
use crate::routines::output::OutputFile;
use crate::routines::proximal::{Penalty, SCAD_A};
use config::Config as eConfig;
use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Contains all settings for a run
#[derive(Debug, Deserialize, Clone, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub solver: Solver,
    #[serde(default)]
    pub penalty: Penalization,
    #[serde(default)]
    pub adaptive: Adaptive,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub output: Output,
}

impl Settings {
    /// Read settings from a TOML file, overridden by `PHYLASSO_*` environment variables
    ///
    /// Nested keys are separated by a double underscore, e.g. `PHYLASSO_SOLVER__MAX_ITER=500`.
    pub fn read(path: &str) -> Result<Settings> {
        let parsed = eConfig::builder()
            .add_source(config::File::with_name(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix("PHYLASSO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .wrap_err_with(|| format!("Failed to read settings from {}", path))?;

        let settings: Settings = parsed
            .try_deserialize()
            .wrap_err("Failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the configuration describes a valid optimization problem
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.penalty.validate()?;
        self.adaptive.validate()?;
        Ok(())
    }

    /// Write the settings as JSON to the output folder
    pub fn write(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        let outputfile = OutputFile::new(&self.output.path, "settings.json")?;
        std::io::Write::write_all(&mut outputfile.file(), serialized.as_bytes())?;
        tracing::debug!("Settings written to {:?}", outputfile.relative_path());
        Ok(())
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.config.algorithm = algorithm;
    }

    pub fn set_gamma(&mut self, gamma: f64) {
        self.penalty.gamma = gamma;
    }

    pub fn set_cycles(&mut self, cycles: usize) {
        self.adaptive.cycles = cycles;
    }

    pub fn set_output_path(&mut self, path: &str) {
        self.output.path = path.to_string();
    }
}

/// General configuration
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The optimization routine to run
    pub algorithm: Algorithm,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            algorithm: Algorithm::ADALASSO,
        }
    }
}

/// Options of the proximal gradient solvers
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Solver {
    /// Nominal step size, restored whenever the step size decays below `min_step_size`
    pub step_size: f64,
    /// Backtracking shrink factor in (0, 1)
    pub shrink: f64,
    pub max_iter: usize,
    /// Absolute tolerance on the change of the penalized objective; `None` runs to `max_iter`
    pub abstol: Option<f64>,
    pub min_step_size: f64,
    /// Maximum number of step size reductions in a single backtracking search
    pub max_backtracks: usize,
    /// Restart the accelerated solver when the step size decays below `min_step_size`
    pub step_size_restart: bool,
    /// Report restarts of the accelerated solver at info level
    pub monitor: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Solver {
            step_size: 1e-2,
            shrink: 0.5,
            max_iter: MAX_ITER,
            abstol: Some(ABSTOL),
            min_step_size: MIN_STEP_SIZE,
            max_backtracks: MAX_BACKTRACKS,
            step_size_restart: true,
            monitor: false,
        }
    }
}

impl Solver {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            bail!("Step size must be positive, got {}", self.step_size);
        }
        if !(self.shrink > 0.0 && self.shrink < 1.0) {
            bail!("Backtracking shrink factor must lie in (0, 1), got {}", self.shrink);
        }
        if self.max_iter == 0 {
            bail!("The maximum number of iterations must be at least one");
        }
        if let Some(abstol) = self.abstol {
            if !(abstol >= 0.0) {
                bail!("Absolute tolerance must be non-negative, got {}", abstol);
            }
        }
        if !(self.min_step_size > 0.0) {
            bail!("Minimum step size must be positive, got {}", self.min_step_size);
        }
        if self.max_backtracks == 0 {
            bail!("At least one backtracking step must be allowed");
        }
        Ok(())
    }
}

/// The supported penalties
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyKind {
    L1,
    L2,
    Scad,
}

/// Penalty configuration
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Penalization {
    pub kind: PenaltyKind,
    /// Global penalty strength
    pub gamma: f64,
    /// Shape constant of the SCAD penalty
    pub scad_a: f64,
}

impl Default for Penalization {
    fn default() -> Self {
        Penalization {
            kind: PenaltyKind::L1,
            gamma: 1e-2,
            scad_a: SCAD_A,
        }
    }
}

impl Penalization {
    pub fn validate(&self) -> Result<()> {
        if !(self.gamma.is_finite() && self.gamma >= 0.0) {
            bail!("Penalty strength must be non-negative, got {}", self.gamma);
        }
        self.penalty().validate()
    }

    /// Resolve the configured penalty
    pub fn penalty(&self) -> Penalty {
        match self.kind {
            PenaltyKind::L1 => Penalty::L1,
            PenaltyKind::L2 => Penalty::L2,
            PenaltyKind::Scad => Penalty::Scad { a: self.scad_a },
        }
    }
}

/// Adaptive weight scheduling
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Adaptive {
    /// Number of reweighting cycles
    pub cycles: usize,
    /// Exponent `p` of the weights `1 / (x + eps)^p`
    pub exponent: f64,
    /// Report the sparsity of each cycle at info level
    pub sparsity_monitor: bool,
}

impl Default for Adaptive {
    fn default() -> Self {
        Adaptive {
            cycles: 4,
            exponent: 1.0,
            sparsity_monitor: false,
        }
    }
}

impl Adaptive {
    pub fn validate(&self) -> Result<()> {
        if self.cycles == 0 {
            bail!("At least one adaptive cycle is required");
        }
        if !self.exponent.is_finite() {
            bail!("Weight exponent must be finite, got {}", self.exponent);
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Log {
    /// Log level, e.g. "info", "debug" or "trace"
    pub level: String,
    /// Name of the log file within the output folder
    pub file: String,
    /// Whether to write a log file
    pub write: bool,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: String::from("info"),
            file: String::from("log.txt"),
            write: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Output {
    /// Whether to write result files
    pub write: bool,
    /// Folder the result files are written to
    pub path: String,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            write: false,
            path: String::from("outputs/"),
        }
    }
}
