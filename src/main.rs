use clap::{Parser as ClapParser, Subcommand};
use codebuilder::cli::{
    self, CheckOptions, CliError, CompileOptions, CompileOutput, FieldsOptions, Target,
};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "codebuilder")]
#[command(about = "Codebuilder - compile query-builder expression trees to search queries and C# code")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a wire-format expression
    Compile {
        /// What to generate
        #[arg(value_enum)]
        target: Target,

        /// Expression JSON (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print query output
        #[arg(short, long)]
        pretty: bool,

        /// Operation catalog file (JSON array of operations)
        #[arg(long)]
        operations: Option<PathBuf>,

        /// Namespace for generated calls
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Decode an expression and print its canonical form
    Check {
        /// Expression JSON (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List the fields found in sample JSON documents
    Fields {
        /// Sample JSON (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Only show fields below this dotted path, re-rooted there
        #[arg(long)]
        scope: Option<String>,

        /// Regex over full field names; parents of matches are kept
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            target,
            input,
            pretty,
            operations,
            namespace,
        } => run_compile(target, input, pretty, operations, namespace),
        Commands::Check { input, pretty } => run_check(input, pretty),
        Commands::Fields {
            input,
            scope,
            filter,
        } => run_fields(input, scope, filter),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "codebuilder=debug" } else { "codebuilder=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}

fn run_compile(
    target: Target,
    input: Option<String>,
    pretty: bool,
    operations: Option<PathBuf>,
    namespace: Option<String>,
) -> Result<(), CliError> {
    let operations = operations.map(std::fs::read_to_string).transpose()?;
    let options = CompileOptions {
        target,
        input: read_input(input)?,
        operations,
        namespace,
    };

    match cli::execute_compile(&options)? {
        CompileOutput::Code(code) => println!("{}", code),
        CompileOutput::Query(document) => print_json(&document, pretty)?,
    }
    Ok(())
}

fn run_check(input: Option<String>, pretty: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        input: read_input(input)?,
    };

    let report = cli::execute_check(&options)?;
    match report.kind {
        Some(kind) => {
            let value_type = report
                .value_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            eprintln!("{:?} ({})", kind, value_type);
        }
        None => eprintln!("null expression"),
    }
    if !report.stable {
        eprintln!("warning: expression changed after a copy round-trip");
    }
    print_json(&report.canonical, pretty)
}

fn run_fields(
    input: Option<String>,
    scope: Option<String>,
    filter: Option<String>,
) -> Result<(), CliError> {
    let options = FieldsOptions {
        input: read_input(input)?,
        scope,
        filter,
    };

    for line in cli::execute_fields(&options)? {
        println!("{}", line);
    }
    Ok(())
}
