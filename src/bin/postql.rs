//! postql: compile post queries from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Compile a query and print the argument map
//! postql compile --type product --meta 'price>=10::NUMERIC' --tax 'size.name IN [M, L]'
//!
//! # Show the operator tables
//! postql grammar
//!
//! # Show the merged configuration
//! postql config
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use postql::adapter::Shortcut;
use postql::parser::{parse_meta, parse_taxonomy, parse_where};
use postql::prelude::{Argument, Arguments, ConfigProvider, Configurator, GlobalSettings, Grammar};
use postql::prelude::{QueryBuilder, SortOrder};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "postql")]
#[command(version = "0.1.0")]
#[command(about = "Compile fluent post queries into backend arguments", long_about = None)]
#[command(after_help = "EXAMPLES:
    postql compile --type post --where 'post_status=draft' --limit 5
    postql compile --meta 'size=M' --or-meta 'size=L'
    postql compile --tax 'category.slug news' --shortcut authorIn=3")]
struct Cli {
    /// Global settings file (TOML)
    #[arg(long, global = true, env = "POSTQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query and print its arguments
    Compile(CompileArgs),
    /// Show the operator, comparator and shortcut tables
    Grammar,
    /// Show the merged configuration
    Config,
}

#[derive(clap::Args)]
struct CompileArgs {
    /// Post type, `*` for every type
    #[arg(short = 't', long = "type", default_value = "*")]
    post_type: String,

    /// Plain filter: column<op>value
    #[arg(short, long = "where")]
    wheres: Vec<String>,

    /// Meta filter: key<op>value[::TYPE]
    #[arg(short, long)]
    meta: Vec<String>,

    /// Meta filter joined with OR
    #[arg(long)]
    or_meta: Vec<String>,

    /// Taxonomy filter: taxonomy.field<op>value
    #[arg(long)]
    tax: Vec<String>,

    /// Taxonomy filter joined with OR
    #[arg(long)]
    or_tax: Vec<String>,

    /// Shortcut filter: name=value (e.g. authorIn=3)
    #[arg(short, long)]
    shortcut: Vec<String>,

    #[arg(short, long)]
    limit: Option<i64>,

    #[arg(long)]
    offset: Option<i64>,

    #[arg(long)]
    order_by: Option<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Local setting: key=value
    #[arg(long)]
    set: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "postql=debug" } else { "postql=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let global = GlobalSettings::process();
    load_settings(&global, cli.config.as_ref())?;

    match &cli.command {
        Commands::Compile(args) => compile(args, global),
        Commands::Grammar => {
            show_grammar();
            Ok(())
        }
        Commands::Config => {
            show_config(global);
            Ok(())
        }
    }
}

/// Load the explicit settings file, or the default one if it exists.
fn load_settings(global: &GlobalSettings, explicit: Option<&PathBuf>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => match postql::config::default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(()),
        },
    };
    global
        .load_toml(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    tracing::info!("Loaded settings from {}", path.display());
    Ok(())
}

fn compile(args: &CompileArgs, global: GlobalSettings) -> Result<()> {
    let mut query = QueryBuilder::with_global(global).of_type(args.post_type.as_str());

    for pair in &args.set {
        let (key, value) = split_pair(pair)?;
        query = query.set_config(key, value);
    }
    for expr in &args.wheres {
        query = query.where_(parse_where(expr)?.into_where_args())?;
    }
    for expr in &args.meta {
        query = query.where_meta(parse_meta(expr)?.into_meta_args());
    }
    for expr in &args.or_meta {
        query = query.or_where_meta(parse_meta(expr)?.into_meta_args());
    }
    for expr in &args.tax {
        query = query.where_taxonomy(parse_taxonomy(expr)?.into_taxonomy_args());
    }
    for expr in &args.or_tax {
        query = query.or_where_taxonomy(parse_taxonomy(expr)?.into_taxonomy_args());
    }
    for pair in &args.shortcut {
        let (name, value) = split_pair(pair)?;
        query = query.shortcut(name, value)?;
    }
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = args.offset {
        query = query.offset(offset);
    }
    if let Some(column) = &args.order_by {
        let direction = if args.desc { SortOrder::Desc } else { SortOrder::Asc };
        query = query.order_by_dir(column.as_str(), direction);
    }

    let arguments = query.to_arguments();
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&arguments)?);
        }
        OutputFormat::Table => print_table(&arguments),
    }
    Ok(())
}

/// Split `key=value`, reading the value as JSON when it parses.
fn split_pair(pair: &str) -> Result<(&str, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .with_context(|| format!("Expected key=value, got '{}'", pair))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.trim(), value))
}

fn print_table(arguments: &Arguments) {
    if arguments.is_empty() {
        println!("{}", "(no arguments)".dimmed());
        return;
    }

    let width = arguments.keys().map(str::len).max().unwrap_or(0);
    println!(
        "{:width$}   {}",
        "Argument".white().bold(),
        "Value".white().bold(),
        width = width
    );
    println!("{}", "─".repeat(width + 40).dimmed());

    for (name, argument) in arguments.iter() {
        let rendered = match argument {
            Argument::Value(value) => val_to_string(value),
            Argument::Clauses(list) => serde_json::to_string(list).unwrap_or_default(),
        };
        println!("{:width$}   {}", name.cyan(), rendered, width = width);
    }

    println!();
    println!("{} argument(s)", arguments.len().to_string().cyan());
}

fn val_to_string(val: &Value) -> String {
    match val {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn show_grammar() {
    let grammar = Grammar::default();

    println!("{}", "postql grammar".cyan().bold());
    println!();

    let tables: [(&str, &[&str]); 4] = [
        ("Operators", grammar.operators()),
        ("Taxonomy operators", grammar.taxonomy_operators()),
        ("Comparators", grammar.comparators()),
        ("Taxonomy fields", grammar.taxonomy_fields()),
    ];
    for (title, entries) in tables {
        println!("{}", title.white().bold());
        println!("  {}", entries.join(", ").yellow());
        println!();
    }

    println!("{}", "Shortcuts".white().bold());
    for shortcut in Shortcut::ALL {
        println!(
            "  {:16} {:20} {}",
            shortcut.name().cyan(),
            shortcut.target().white(),
            format!("{:?}", shortcut.coercion()).to_lowercase().dimmed()
        );
    }
    println!();

    println!("{}", "Formatters".white().bold());
    let names: Vec<&str> = grammar.formatters().iter().map(|(name, _)| *name).collect();
    println!("  {}", names.join(", ").yellow());
}

fn show_config(global: GlobalSettings) {
    let config = Configurator::new(global);
    let settings = config.dump();

    println!("{}", "postql configuration".cyan().bold());
    println!();
    for (name, value) in &settings {
        println!("  {:16} {}", name.white(), val_to_string(value).yellow());
    }
}
