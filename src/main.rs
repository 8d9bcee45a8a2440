use clap::Parser;
use regvm::{run_greeting, Console, HostCodes, HostError, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Runs the greeting program on a register machine wired to this terminal.
#[derive(Parser, Debug)]
#[command(name = "regvm", version, about)]
struct Cli {
    /// JSON table overriding opcode, register, native and operand-kind ids
    #[arg(long, value_name = "FILE")]
    codes: Option<PathBuf>,

    /// Size of each answer buffer in bytes
    #[arg(
        long,
        default_value_t = DEFAULT_BUFFER_SIZE,
        value_parser = clap::value_parser!(u64).range(1..=MAX_BUFFER_SIZE)
    )]
    buffer_size: u64,

    /// Log machine activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<(), HostError> {
    let codes = match &cli.codes {
        Some(path) => HostCodes::from_json_file(path)?,
        None => HostCodes::default(),
    };
    let console = Console::new(io::stdin().lock(), io::stdout());
    run_greeting(&console, &codes, cli.buffer_size)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "regvm failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
