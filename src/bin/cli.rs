//! Binary entry point for the nestql CLI.
#![forbid(unsafe_code)]

#[path = "cli/vars.rs"]
mod vars;

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nestql::{
    config::{Config, CONFIG_ENV},
    logging::init_logging,
    InMemoryCatalog, QueryService, Request, Response, SqliteCatalog, SqliteEngine,
};

#[derive(Parser, Debug)]
#[command(
    name = "nestql",
    version,
    about = "Run nested queries against a SQLite database",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = CONFIG_ENV,
        value_name = "FILE",
        help = "Config file (defaults to <config dir>/nestql/config.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "FILTER", help = "Log filter, e.g. nestql=debug")]
    log: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    #[arg(long, value_name = "FILE", help = "SQLite database to query")]
    db: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "TOML catalog to use instead of introspecting the database"
    )]
    catalog: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryCmd {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(
        long = "var",
        value_name = "NAME=VALUE",
        value_parser = vars::parse_var,
        help = "Query variable; VALUE is read as JSON, falling back to a string"
    )]
    vars: Vec<(String, serde_json::Value)>,

    #[arg(value_name = "QUERY", help = "Query document, or '-' to read stdin")]
    query: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run a query document")]
    Query(QueryCmd),

    #[command(about = "Print the entity catalog")]
    Schema {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.clone())?;
    init_logging(cli.log.as_deref().or(config.log()))?;

    match cli.command {
        Command::Query(cmd) => {
            let (catalog, engine) = open_source(&cmd.source, &config)?;
            let service = QueryService::new(catalog, engine).with_max_depth(config.max_depth());
            let mut request = Request::new(read_query(&cmd.query)?);
            request.variables.extend(cmd.vars);
            let response = service.handle(&request);
            emit(&cli.format, &response, |_| print_response_text(&response))?;
        }
        Command::Schema { source } => {
            let (catalog, _) = open_source(&source, &config)?;
            match cli.format {
                OutputFormat::Json => {
                    let entities: Vec<_> = catalog.entities().collect();
                    println!("{}", serde_json::to_string_pretty(&entities)?);
                }
                OutputFormat::Text => print!("{}", catalog.to_toml_string()?),
            }
        }
    }
    Ok(())
}

fn open_source(
    source: &SourceArgs,
    config: &Config,
) -> Result<(InMemoryCatalog, SqliteEngine), Box<dyn Error>> {
    let db = source
        .db
        .as_deref()
        .or(config.database())
        .ok_or("no database given; pass --db or set `database` in the config")?;
    let engine = SqliteEngine::open_read_only(db)?;
    let catalog = match source.catalog.as_deref().or(config.catalog()) {
        Some(path) => InMemoryCatalog::load(path)?,
        None => SqliteCatalog::introspect(engine.connection(), config.id_field())?.into_inner(),
    };
    Ok((catalog, engine))
}

fn read_query(arg: &str) -> Result<String, Box<dyn Error>> {
    if arg != "-" {
        return Ok(arg.to_owned());
    }
    let mut query = String::new();
    std::io::stdin().read_to_string(&mut query)?;
    Ok(query)
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_response_text(response: &Response) {
    match &response.data {
        Some(data) => match serde_json::to_string_pretty(data) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("<unprintable data: {err}>"),
        },
        None => println!("null"),
    }
    for query in &response.queries {
        println!("query: {query}");
    }
    for error in &response.errors {
        println!("error: {error}");
    }
}

