use buildcond::cli::{self, CheckOptions, CheckResult, CliError};
use buildcond::state::ElementLocation;
use clap::{Parser as ClapParser, Subcommand};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

#[derive(ClapParser)]
#[command(name = "bcond")]
#[command(about = "bcond - evaluate build-file conditions such as '$(Configuration)' == 'Debug'")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and evaluate a condition
    Check {
        /// The condition to evaluate
        condition: String,

        /// JSON state file with properties and items (reads stdin if not provided)
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Define a property
        #[arg(short = 'p', long = "property", value_name = "NAME=VALUE")]
        properties: Vec<String>,

        /// Add an item
        #[arg(short = 'i', long = "item", value_name = "TYPE=INCLUDE")]
        items: Vec<String>,

        /// Undefined properties and metadata are errors
        #[arg(long)]
        strict: bool,

        /// Reject item list references
        #[arg(long)]
        no_item_lists: bool,

        /// Reject item metadata references
        #[arg(long)]
        no_metadata: bool,

        /// File the condition came from, for error messages
        #[arg(long)]
        file: Option<String>,

        #[arg(long, default_value_t = 0)]
        line: usize,

        #[arg(long, default_value_t = 0)]
        column: usize,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print the tokens of a condition
    Tokens {
        condition: String,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            condition,
            state,
            properties,
            items,
            strict,
            no_item_lists,
            no_metadata,
            file,
            line,
            column,
            pretty,
            syntax_only,
        } => read_state(state, syntax_only).and_then(|state| {
            let options = CheckOptions {
                condition,
                state,
                properties,
                items,
                strict,
                allow_item_lists: !no_item_lists,
                allow_item_metadata: !no_metadata,
                location: ElementLocation { file, line, column },
                syntax_only,
            };
            run_check(&options, pretty)
        }),
        Commands::Tokens { condition, pretty } => {
            cli::execute_tokens(&condition).and_then(|tokens| print_json(&tokens, pretty))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// The state document from `--state`, or from stdin when it is piped.
fn read_state(path: Option<PathBuf>, syntax_only: bool) -> Result<Option<String>, CliError> {
    match path {
        Some(path) => Ok(Some(fs::read_to_string(path)?)),
        None if !syntax_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(Some(buffer).filter(|s| !s.trim().is_empty()))
        }
        None => Ok(None),
    }
}

fn run_check(options: &CheckOptions, pretty: bool) -> Result<(), CliError> {
    match cli::execute_check(options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => print_json(&output, pretty)?,
    }
    Ok(())
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
