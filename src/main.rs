use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run a query against a JSON document.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the JSON document
    file: PathBuf,
    /// Query expression, e.g. "Account.Order.*.Product.*.>multiply(Price,Quantity).>add"
    query: String,
    /// Print the result on a single line
    #[arg(long)]
    compact: bool,
    /// Print the parsed syntax tree instead of evaluating
    #[arg(long)]
    ast: bool,
    /// Log parser backtracking to stderr
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.trace {
        EnvFilter::new("jsonquery=trace")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.ast {
        return match jsonquery::parse(&args.query) {
            Ok(node) => print_json(&node, args.compact),
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let document = match std::fs::read_to_string(&args.file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("{}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    match jsonquery::interpret(&args.query, &document) {
        Ok(value) => print_json(&value, args.compact),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> ExitCode {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match rendered {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
