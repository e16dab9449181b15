use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evalrank::config::Config;
use evalrank::input::EvaluationInput;
use evalrank::output;
use evalrank::{EngineError, Session};

const EXIT_SUCCESS: i32 = 0;
const EXIT_GATE_BLOCKED: i32 = 1;
const EXIT_ENGINE: i32 = 2;
const EXIT_INPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Table,
    Tsv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score, gate, rank and grade the subjects in an input file
    Rank {
        /// Subject data (YAML or JSON)
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Also write the evaluation as a JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check every rater column against the calibration band
    Gate {
        input: PathBuf,
    },
    /// Print the tier label for a score
    Classify {
        #[arg(allow_negative_numbers = true)]
        score: f64,
    },
    /// List subjects an alternative strategy ranks in its top N but the baseline does not
    Compare {
        input: PathBuf,
        #[arg(long)]
        baseline: String,
        #[arg(long)]
        alternative: String,
        #[arg(long)]
        top: usize,
    },
    /// Write the built-in defaults to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "evalrank")]
#[command(about = "Composite scoring, calibration gate and ranking for evaluation sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/evalrank/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "evalrank=debug" } else { "evalrank=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let start_time = Instant::now();

    if let Commands::Init { force } = cli.command {
        let path = match cli.config.map(Ok).unwrap_or_else(evalrank::config::get_config_path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Config error: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
        };
        if let Err(e) = evalrank::config::write_default_config(&path, force) {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
        println!("Wrote default config to {}", path.display());
        std::process::exit(EXIT_SUCCESS);
    }

    // Load and validate config at startup
    let config = match evalrank::config::load_config(cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    if let Err(errors) = evalrank::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let use_colors = output::should_use_colors();

    let code = match cli.command {
        Commands::Rank {
            input,
            format,
            output: report_path,
        } => {
            let input = load_input_or_exit(&input);
            let session = session_or_exit(&config, &input);
            let eval = match session.evaluate() {
                Ok(e) => e,
                Err(e) => engine_exit(e),
            };

            match format {
                Format::Table => {
                    println!("{}", output::format_rank_table(&eval, &config.tiers, use_colors));
                    if !eval.entries.is_empty() {
                        println!();
                        println!("{}", output::format_tier_summary(&eval));
                    }
                    if !eval.submittable() {
                        eprintln!();
                        eprintln!("{}", output::format_gate_report(&eval.gate, use_colors));
                    }
                }
                Format::Tsv => println!("{}", output::format_tsv(&eval)),
                Format::Json => match output::format_json(&eval) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("{:#}", e);
                        std::process::exit(EXIT_ENGINE);
                    }
                },
            }

            if let Some(path) = report_path {
                if let Err(e) = evalrank::report::save_report(&path, &eval) {
                    eprintln!("Failed to write report: {:#}", e);
                    std::process::exit(EXIT_INPUT);
                }
                info!(path = %path.display(), "report written");
            }

            if eval.submittable() {
                EXIT_SUCCESS
            } else {
                eprintln!("Submission blocked: rater scores are outside the calibration band.");
                EXIT_GATE_BLOCKED
            }
        }
        Commands::Gate { input } => {
            let input = load_input_or_exit(&input);
            let session = session_or_exit(&config, &input);
            match session.gate() {
                Ok(report) => {
                    println!("{}", output::format_gate_report(&report, use_colors));
                    if report.blocked() {
                        EXIT_GATE_BLOCKED
                    } else {
                        EXIT_SUCCESS
                    }
                }
                Err(e) => engine_exit(e),
            }
        }
        Commands::Classify { score } => match evalrank::scoring::classify(score, &config.tiers) {
            Ok(label) => {
                println!("{}", label);
                EXIT_SUCCESS
            }
            Err(e) => engine_exit(e),
        },
        Commands::Compare {
            input,
            baseline,
            alternative,
            top,
        } => {
            let input = load_input_or_exit(&input);
            let session = session_or_exit(&config, &input);
            match session.compare(&baseline, &alternative, top) {
                Ok(diff) => {
                    println!(
                        "{}",
                        output::format_hidden_gems(&diff, &baseline, &alternative, use_colors)
                    );
                    EXIT_SUCCESS
                }
                Err(e) => engine_exit(e),
            }
        }
        Commands::Init { .. } => unreachable!("handled before config load"),
    };

    debug!(elapsed = ?start_time.elapsed(), "done");
    std::process::exit(code);
}

fn load_input_or_exit(path: &Path) -> EvaluationInput {
    match evalrank::input::load_input(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Input error: {:#}", e);
            std::process::exit(EXIT_INPUT);
        }
    }
}

fn session_or_exit<'a>(config: &'a Config, input: &EvaluationInput) -> Session<'a> {
    match Session::from_input(config, input) {
        Ok(s) => s,
        Err(e) => engine_exit(e),
    }
}

fn engine_exit(e: EngineError) -> ! {
    eprintln!("{}", e);
    std::process::exit(EXIT_ENGINE);
}
