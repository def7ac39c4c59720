use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use impactrun::commands::{self, ComputeOptions, ScoreFactors};
use impactrun::init_logging;
use impactrun::io::{atomic_write, load_factors, load_model, load_overrides, to_json};
use impactrun_core::analysis::SensitivityConfig;
use impactrun_core::config::SamplingStrategy;
use impactrun_core::model::EfVersion;
use impactrun_core::{BatchProgress, ImpactModel, SamplingConfig};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "impactrun")]
#[command(about = "Evaluate parameterized life-cycle impact models")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the model for default or overridden parameter values
    Compute {
        model: PathBuf,
        /// YAML map of parameter name to a value or a list of values
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Include the per-node breakdown
        #[arg(long)]
        report: bool,
        /// YAML normalisation factors per indicator
        #[arg(long, requires = "weighting")]
        normalisation: Option<PathBuf>,
        /// YAML weighting factors per indicator
        #[arg(long, requires = "normalisation")]
        weighting: Option<PathBuf>,
    },
    /// List parameters, indicators and nodes of the model
    Describe { model: PathBuf },
    /// Sample the parameters and summarize the spread of each indicator
    Uncertainty {
        model: PathBuf,
        #[arg(short = 'n', long, default_value_t = 1000)]
        samples: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = Strategy::MonteCarlo)]
        strategy: Strategy,
        /// Percentiles to report, as fractions
        #[arg(long, value_delimiter = ',')]
        percentiles: Vec<f64>,
    },
    /// Sobol sensitivity indices of every indicator
    Sobol {
        model: PathBuf,
        #[arg(short = 'n', long, default_value_t = 1024)]
        base_samples: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Parameter to vary; repeat for several, all parameters when omitted
        #[arg(short, long = "parameter")]
        parameters: Vec<String>,
        /// Also compute indices for every node
        #[arg(long)]
        all_nodes: bool,
    },
    /// List known impact assessment methods
    Methods {
        #[arg(long, value_enum)]
        version: Option<Version>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Strategy {
    MonteCarlo,
    LatinHypercube,
}

impl From<Strategy> for SamplingStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::MonteCarlo => SamplingStrategy::MonteCarlo,
            Strategy::LatinHypercube => SamplingStrategy::LatinHypercube,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Version {
    #[value(name = "3.0")]
    V30,
    #[value(name = "3.1")]
    V31,
}

impl From<Version> for EfVersion {
    fn from(version: Version) -> Self {
        match version {
            Version::V30 => EfVersion::V30,
            Version::V31 => EfVersion::V31,
        }
    }
}

fn compile(path: &Path) -> color_eyre::Result<ImpactModel> {
    let definition = load_model(path)?;
    Ok(ImpactModel::from_definition(&definition)?)
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> color_eyre::Result<()> {
    let json = to_json(value)?;
    match output {
        Some(path) => {
            atomic_write(path, &json)?;
            tracing::info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level)?;
    let output = args.output.as_deref();

    match args.command {
        Command::Compute {
            model,
            overrides,
            report,
            normalisation,
            weighting,
        } => {
            let model = compile(&model)?;
            let factors = match (normalisation, weighting) {
                (Some(n), Some(w)) => Some(ScoreFactors {
                    normalisation: load_factors(&n)?,
                    weighting: load_factors(&w)?,
                }),
                _ => None,
            };
            let options = ComputeOptions {
                overrides: match overrides {
                    Some(path) => load_overrides(&path)?,
                    None => Default::default(),
                },
                report,
                factors,
            };
            emit(&commands::compute(&model, &options)?, output)
        }
        Command::Describe { model } => emit(&commands::describe(&compile(&model)?), output),
        Command::Uncertainty {
            model,
            samples,
            seed,
            strategy,
            percentiles,
        } => {
            let model = compile(&model)?;
            let mut config = SamplingConfig {
                samples,
                seed,
                strategy: strategy.into(),
                ..Default::default()
            };
            if !percentiles.is_empty() {
                config.percentiles = percentiles;
            }
            let progress = BatchProgress::new();
            emit(&commands::uncertainty(&model, &config, &progress)?, output)
        }
        Command::Sobol {
            model,
            base_samples,
            seed,
            parameters,
            all_nodes,
        } => {
            let model = compile(&model)?;
            let config = SensitivityConfig {
                base_samples,
                seed,
                parameters,
                all_nodes,
            };
            let progress = BatchProgress::new();
            emit(&commands::sobol(&model, &config, &progress)?, output)
        }
        Command::Methods { version } => emit(&commands::methods(version.map(Into::into)), output),
    }
}
