use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toys::{parser, run_program, Error};

#[derive(Debug, Parser)]
#[command(name = "toys", version, about = "Run a toys program")]
struct Cli {
    /// Source file to run. Reads standard input when omitted or `-`.
    input: Option<PathBuf>,

    /// Print the parsed program to stderr before running it.
    #[arg(long)]
    dump_ast: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(result) => {
            println!("{}", result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<i64, Error> {
    let source = read_source(cli.input.as_ref())?;
    let program = parser::parse(&source)?;
    tracing::info!(definitions = program.definitions.len(), "parsed program");

    if cli.dump_ast {
        eprint!("{}", program);
    }

    Ok(run_program(&program)?)
}

fn read_source(input: Option<&PathBuf>) -> Result<String, Error> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            std::fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.display().to_string(),
                source,
            })
        }
        _ => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|source| Error::Read {
                    path: "<stdin>".to_string(),
                    source,
                })?;
            Ok(source)
        }
    }
}
