use clap::{Parser as ClapParser, Subcommand};
use mql_lang::cli::{self, CliError, CompileCommand, CompileResult};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "mql")]
#[command(about = "MQL - Compiles Mongo-style JSON filters into parameterized entity queries")]
#[command(version)]
struct Cli {
    /// Log compiler internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filter into row and count queries
    Compile {
        /// The filter JSON (reads from stdin if not provided)
        filter: Option<String>,

        /// Schema JSON file
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Entity of the root query
        #[arg(short, long)]
        entity: Option<String>,

        /// Alias of the root query
        #[arg(short, long)]
        alias: Option<String>,

        /// Order term, e.g. "name desc nulls last" (repeatable)
        #[arg(short, long = "order")]
        order: Vec<String>,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,

        /// Index of the first row
        #[arg(long)]
        offset: Option<usize>,

        /// Resolve operand maps with several operators by priority
        #[arg(long)]
        lenient: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't compile
        #[arg(long)]
        syntax_only: bool,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'mql docs' to list categories)
        category: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compile {
            filter,
            schema,
            entity,
            alias,
            order,
            limit,
            offset,
            lenient,
            pretty,
            syntax_only,
        } => read_schema(schema).and_then(|schema| {
            let command = CompileCommand {
                filter,
                schema,
                entity,
                alias,
                order_by: order,
                limit,
                offset,
                lenient,
                syntax_only,
            };
            run_compile(command, pretty)
        }),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| {
            print!("{}", content);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_schema(path: Option<PathBuf>) -> Result<Option<String>, CliError> {
    path.map(std::fs::read_to_string).transpose().map_err(CliError::Io)
}

fn run_compile(mut command: CompileCommand, pretty: bool) -> Result<(), CliError> {
    if command.filter.is_none() && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        command.filter = Some(buffer);
    }

    match cli::execute_compile(&command)? {
        CompileResult::SyntaxValid => println!("Syntax is valid"),
        CompileResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
