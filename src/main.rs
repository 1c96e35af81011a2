use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use opstack::codegen::{PrimitiveKind, Trace, numeric_conversion, replay};
use opstack::config::CodegenConfig;
use opstack::vm::{Verifier, format_code};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Parser)]
#[command(name = "opstack")]
#[command(about = "Operand stack simulator for a JVM code generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace of stack operations and print the emitted code
    Replay {
        /// Trace file (.json, or .toml)
        #[arg(value_name = "TRACE")]
        file: PathBuf,

        /// Code generation config (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format (human or json)
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Log every emitted instruction
        #[arg(long)]
        trace: bool,

        /// Check the emitted code's slot heights against the final model
        #[arg(long)]
        verify: bool,
    },
    /// Print the numeric conversion matrix
    Matrix,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let trace_emission = matches!(cli.command, Commands::Replay { trace: true, .. });
    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if trace_emission {
        logger.filter_module("opstack::emit", LevelFilter::Trace);
    }
    logger.init();

    match cli.command {
        Commands::Replay {
            file,
            config,
            format,
            trace,
            verify,
        } => {
            if let Err(e) = run_replay(&file, config.as_deref(), format, trace, verify) {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        Commands::Matrix => print!("{}", matrix_listing()),
    }

    ExitCode::SUCCESS
}

fn run_replay(
    path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    trace_emission: bool,
    verify: bool,
) -> Result<(), String> {
    let mut config = match config_path {
        Some(p) => CodegenConfig::load(p)?,
        None => CodegenConfig::default(),
    };
    config.trace_emission |= trace_emission;

    let trace = Trace::load(path)?;
    if verify && trace.has_model_only_steps() {
        return Err("--verify needs a trace without push, remove or replace steps".to_string());
    }

    let replay = replay(&trace, &config)?;
    let report = replay.report();

    if verify {
        let height = Verifier::new()
            .verify(&replay.code, 0)
            .map_err(|e| format!("verification failed: {}", e))?;
        if height != report.slot_depth {
            return Err(format!(
                "verification failed: code leaves {} slots, model holds {}",
                height, report.slot_depth
            ));
        }
    }

    match format {
        OutputFormat::Human => {
            let title = if trace.callable.is_empty() { "trace" } else { &trace.callable };
            print!("{}", format_code(title, &replay.code));
            println!("{}", replay.stack);
            println!("slots: {}", report.slot_depth);
            if verify {
                println!("verified");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("failed to serialize report: {}", e))?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn matrix_listing() -> String {
    let mut out = String::new();
    for from in PrimitiveKind::ALL {
        for to in PrimitiveKind::ALL {
            if from == to {
                continue;
            }
            let ops = match numeric_conversion(from, to) {
                Some([]) => "(none)".to_string(),
                Some(ops) => ops.iter().map(|op| op.name()).collect::<Vec<_>>().join(" "),
                None => "box + runtime cast".to_string(),
            };
            out.push_str(&format!("{:>7} -> {:<7} {}\n", from.name(), to.name(), ops));
        }
    }
    out
}
