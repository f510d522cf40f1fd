use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cartalex::config::{self, CartalexConfig};
use cartalex::db::Database;
use cartalex::filters::{EntitySpec, FacetValueSource, FilterCollection, HttpLookup};
use cartalex::output::{json as json_out, table};
use cartalex::server;

#[derive(Parser)]
#[command(
    name = "cartalex",
    version,
    about = "Cartalex — faceted filtering of Alexandria excavation sites"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: ~/.cartalex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to database file (default: ~/.cartalex/cartalex.db)
    #[arg(long, global = true, env = "CARTALEX_DB")]
    db: Option<PathBuf>,

    /// Base URL of the filter server (also CARTALEX_API)
    #[arg(long, global = true)]
    api: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the filter HTTP server
    Serve {
        /// Address to listen on (default from config: 127.0.0.1:3000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the database schema
    InitDb,

    /// Show the value catalogue of a facet
    Values {
        /// Filter category (e.g. vestiges)
        category: String,

        /// Facet within the category (e.g. periode)
        facet: String,
    },

    /// Resolve a set of facet selections into matching site ids
    Filter {
        /// Categorical selection: category.facet=value1|value2 (repeatable)
        #[arg(long = "select")]
        selections: Vec<String>,

        /// Numeric range: category.facet=floor..ceil, either bound may be empty (repeatable)
        #[arg(long = "range", allow_hyphen_values = true)]
        ranges: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .init();

    let json_output = cli.json;
    let cfg = match cli.config {
        Some(ref path) => CartalexConfig::load_from(path)?,
        None => CartalexConfig::load()?,
    };

    match cli.command {
        Commands::Serve { bind } => {
            let db = Database::open(&db_path(cli.db, &cfg)?)?;
            let mut server_cfg = cfg.server.clone();
            if let Some(bind) = bind {
                server_cfg.bind = bind;
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(server::serve(&server_cfg, db))?;
        }

        Commands::InitDb => {
            let path = db_path(cli.db, &cfg)?;
            let db = Database::create(&path)?;
            let version = cartalex::db::schema_version(&db.connect()?)?
                .unwrap_or_else(|| "unknown".to_string());
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "db_path": db.path.display().to_string(),
                    "schema_version": version,
                }))?;
            } else {
                println!("Initialized {} (schema v{version})", db.path.display());
            }
        }

        Commands::Values { category, facet } => {
            let spec = load_spec(&cfg)?;
            let sub_filter = spec
                .category(&category)
                .with_context(|| format!("Unknown filter category: {category}"))?
                .sub_filters
                .iter()
                .find(|s| s.name == facet)
                .with_context(|| format!("Unknown facet {facet} in category {category}"))?;
            if sub_filter.is_numeric {
                bail!("{category}.{facet} is a numeric range and has no value catalogue");
            }

            let lookup = http_lookup(cli.api.as_deref(), &cfg)?;
            let values = lookup.facet_values(&category, sub_filter)?;
            if json_output {
                json_out::print_json(&values)?;
            } else {
                table::print_facet_values(&category, &facet, &values);
            }
        }

        Commands::Filter { selections, ranges } => {
            let mut filters = FilterCollection::new(load_spec(&cfg)?);
            for selection in &selections {
                let (category, facet, values) = parse_selection(selection)?;
                let values = values.split(cartalex::sql::predicate::VALUE_SEPARATOR);
                for value in values.filter(|v| !v.is_empty()) {
                    filters.check_value(category, facet, value)?;
                }
            }
            for range in &ranges {
                let (category, facet, floor, ceil) = parse_range(range)?;
                filters.set_floor(category, facet, floor)?;
                filters.set_ceil(category, facet, ceil)?;
                filters.set_enabled(category, facet, true)?;
            }

            let lookup = http_lookup(cli.api.as_deref(), &cfg)?;
            let outcome = filters.filtered_ids(&lookup)?;
            if json_output {
                json_out::print_json(&json_out::outcome_json(&outcome))?;
            } else {
                table::print_active_filters(&filters);
                println!();
                table::print_outcome(&outcome);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let path = match cli.config {
                    Some(path) => path,
                    None => config::config_path()?,
                };
                println!("Config file: {}", path.display());
                if !path.exists() {
                    println!("(not found, using defaults)");
                }
                println!();
                println!("{}", cfg.display());
            }
            ConfigAction::Init => {
                let path = config::config_path()?;
                if config::init_config()? {
                    println!("Created config file: {}", path.display());
                } else {
                    println!("Config file already exists: {}", path.display());
                }
            }
        },
    }

    Ok(())
}

/// --db / CARTALEX_DB > config file > ~/.cartalex/cartalex.db
fn db_path(flag: Option<PathBuf>, cfg: &CartalexConfig) -> Result<PathBuf> {
    match flag.or_else(|| cfg.server.db_path.clone()) {
        Some(path) => Ok(path),
        None => Database::default_db_path(),
    }
}

fn load_spec(cfg: &CartalexConfig) -> Result<EntitySpec> {
    match cfg.client.filters_path {
        Some(ref path) => EntitySpec::load(path),
        None => EntitySpec::builtin(),
    }
}

fn http_lookup(flag: Option<&str>, cfg: &CartalexConfig) -> Result<HttpLookup> {
    let api_at = config::resolve_setting(flag, "CARTALEX_API", &cfg.client.api_at);
    HttpLookup::new(&api_at, cfg.client.timeout())
}

/// `category.facet=values` → (category, facet, values)
fn parse_selection(arg: &str) -> Result<(&str, &str, &str)> {
    let (target, values) = arg
        .split_once('=')
        .with_context(|| format!("Expected category.facet=value, got: {arg}"))?;
    let (category, facet) = target
        .split_once('.')
        .with_context(|| format!("Expected category.facet before '=', got: {target}"))?;
    Ok((category, facet, values))
}

/// `category.facet=floor..ceil` → (category, facet, floor, ceil)
fn parse_range(arg: &str) -> Result<(&str, &str, &str, &str)> {
    let (category, facet, bounds) = parse_selection(arg)?;
    let (floor, ceil) = bounds
        .split_once("..")
        .with_context(|| format!("Expected floor..ceil, got: {bounds}"))?;
    Ok((category, facet, floor.trim(), ceil.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_arguments() {
        assert_eq!(
            parse_selection("vestiges.caracterisation=mur|colonnade").unwrap(),
            ("vestiges", "caracterisation", "mur|colonnade")
        );
        assert!(parse_selection("vestiges=mur").is_err());
        assert!(parse_selection("vestiges.caracterisation").is_err());
    }

    #[test]
    fn range_arguments_allow_open_bounds() {
        assert_eq!(
            parse_range("vestiges.datations=-300..100").unwrap(),
            ("vestiges", "datations", "-300", "100")
        );
        assert_eq!(
            parse_range("vestiges.datations=..395").unwrap(),
            ("vestiges", "datations", "", "395")
        );
        assert!(parse_range("vestiges.datations=-300").is_err());
    }
}
