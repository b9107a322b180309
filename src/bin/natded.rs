// The natded CLI.
// You can check proof scripts, or print an expression the way the kernel reads it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_backtrace::BacktracePrinter;
use mimalloc::MiMalloc;
use natded::kernel::evaluator::Evaluator;
use natded::syntax::parse_expression;
use natded::verifier::{FileOutcome, Verifier, VerifierConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "natded",
    about = "A natural-deduction proof checker",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// Log progress for every file
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check proof scripts
    Check {
        /// Script files, or directories to search for .nd files
        #[clap(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// How deep tactics may nest before autodeduce gives up
        #[clap(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Don't install the equality prelude in each kernel
        #[clap(long)]
        no_prelude: bool,

        /// Print the results as JSON
        #[clap(long)]
        json: bool,
    },

    /// Read an expression and print it back
    Show {
        #[clap(value_name = "EXPR")]
        expression: String,
    },
}

fn main() {
    // Use RUST_LOG to control log levels, e.g.:
    //   RUST_LOG=natded::auto=debug natded check proofs/
    let default_level = if std::env::args().any(|a| a == "-v" || a == "--verbose") {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    BacktracePrinter::new()
        .add_frame_filter(Box::new(|frames| {
            frames.retain(|frame| frame.name.as_deref().unwrap_or("").contains("natded::"));
        }))
        .install(color_backtrace::default_output_stream());

    let args = Args::parse();

    match args.command {
        Command::Check {
            paths,
            max_depth,
            no_prelude,
            json,
        } => {
            let mut config = VerifierConfig::default();
            config.prelude = !no_prelude;
            if let Some(depth) = max_depth {
                config.kernel.max_auto_depth = depth;
            }

            let output = match Verifier::new(paths, config).run() {
                Ok(output) => output,
                Err(e) => {
                    println!("{}", e);
                    std::process::exit(1);
                }
            };

            if json {
                match serde_json::to_string_pretty(&output) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        println!("Error writing JSON: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                for event in &output.events {
                    let path = event.path.display();
                    let message = event.message.as_deref().unwrap_or("");
                    match event.outcome {
                        FileOutcome::Verified => {
                            if args.verbose {
                                println!("{}: {} proved", path, event.proved.len());
                            }
                        }
                        FileOutcome::Aborted => println!("{}: aborted: {}", path, message),
                        FileOutcome::Failed => println!("{}: {}", path, message),
                    }
                    for shown in &event.shown {
                        println!("  {}", shown);
                    }
                }
                output.metrics.print(output.status);
            }

            if output.status.is_error() {
                std::process::exit(1);
            }
        }

        Command::Show { expression } => {
            let expression = match parse_expression(&expression) {
                Ok(e) => e,
                Err(e) => {
                    println!("{}", e);
                    std::process::exit(1);
                }
            };
            println!("{}", expression);
            if let Ok(value) = Evaluator::evaluate(&expression) {
                println!("evaluates to {}", value);
            }
        }
    }
}
