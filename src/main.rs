//! CLI tool to tokenize, parse, check, complete and format expressions.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use exprkit::{Kind, Schema};

#[derive(Parser)]
#[command(name = "exprkit", about = "Expression language toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON schema with variables and operators
    #[arg(long, short = 's', global = true)]
    schema: Option<PathBuf>,

    /// Enable log output on stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Print the token stream as JSON
    Tokens { expr: String },

    /// Print the syntax tree as JSON
    Parse { expr: String },

    /// Type-check against the schema and print the root type
    Check {
        expr: String,

        /// Required root type, e.g. `bool`
        #[arg(long)]
        expect: Option<Kind>,
    },

    /// Print completions at a cursor column as JSON
    Suggest {
        expr: String,

        /// Cursor column; defaults to the end of the expression
        #[arg(long)]
        cursor: Option<usize>,

        /// Filter text; defaults to the partial word before the cursor
        #[arg(long)]
        query: Option<String>,
    },

    /// Print the expression in canonical form
    Fmt { expr: String },
}

fn init_tracing(cli: &Cli) {
    // Logs stay off unless asked for; RUST_LOG applies only with --verbose.
    let filter = if cli.verbose && !cli.quiet {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            eprintln!("error: {e}");
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let schema = match &cli.schema {
        Some(path) => match Schema::load(path) {
            Ok(schema) => {
                info!(path = %path.display(), variables = schema.variables.len(), "loaded schema");
                schema
            }
            Err(e) => {
                eprintln!("error: {}", exprkit::Error::from(e));
                return ExitCode::from(2);
            }
        },
        None => Schema::new(),
    };

    let ok = match &cli.command {
        Command::Tokens { expr } => {
            let lexed = exprkit::tokenize(expr);
            let printed = print_json(&lexed.tokens);
            if let Some(err) = &lexed.error {
                eprintln!("{err}");
            }
            printed && lexed.error.is_none()
        }
        Command::Parse { expr } => {
            let lexed = exprkit::tokenize(expr);
            let parsed = exprkit::parse(&lexed.tokens);
            let printed = parsed.ast.as_ref().is_none_or(print_json);
            let diagnostic = parsed
                .error
                .as_ref()
                .map(ToString::to_string)
                .or_else(|| lexed.error.as_ref().map(ToString::to_string));
            if let Some(message) = &diagnostic {
                eprintln!("{message}");
            }
            printed && diagnostic.is_none()
        }
        Command::Check { expr, expect } => {
            let analysis = exprkit::analyze(expr, &schema, *expect);
            match analysis.diagnostic() {
                Some(d) => {
                    eprintln!(
                        "{} at line {}, column {}",
                        d.message, d.location.line, d.location.column
                    );
                    false
                }
                None => analysis.nature.as_ref().is_none_or(print_json),
            }
        }
        Command::Suggest {
            expr,
            cursor,
            query,
        } => {
            let tokens = exprkit::tokenize(expr).tokens;
            let cursor = cursor.unwrap_or_else(|| expr.chars().count());
            let found = match query {
                Some(q) => exprkit::suggest_with_query(cursor, &tokens, q, &schema),
                None => exprkit::suggest(cursor, &tokens, expr, &schema),
            };
            match found {
                Some(suggestions) => print_json(&suggestions),
                None => {
                    eprintln!("no suggestions at column {cursor}");
                    true
                }
            }
        }
        Command::Fmt { expr } => {
            let result = exprkit::tokenize(expr)
                .into_result()
                .map_err(exprkit::Error::from)
                .and_then(|tokens| exprkit::parse(&tokens).into_result().map_err(exprkit::Error::from));
            match result {
                Ok(ast) => {
                    println!("{}", exprkit::format(&ast));
                    true
                }
                Err(e) => {
                    eprintln!("{e}");
                    false
                }
            }
        }
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
