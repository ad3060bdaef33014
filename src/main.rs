//! Industry Calculator
//!
//! Plans manufacturing, research, invention and reaction jobs from a local
//! SQLite catalog.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use industry_calculator::catalog::MemoryCatalog;
use industry_calculator::character::CharacterProfile;
use industry_calculator::config::{Config, DEFAULT_CONFIG_FILE};
use industry_calculator::models::{CopyRuns, RecipeActivity, TypeId};
use industry_calculator::modifier::IndustryModifier;
use industry_calculator::pricing::PriceBook;
use industry_calculator::process::{ProcessNode, Valuation};
use industry_calculator::sources::{Catalog, Character};
use industry_calculator::{BlueprintLevels, Resolver, db, import, report, sample};

#[derive(Parser)]
#[command(name = "industry-calc")]
#[command(about = "Industry calculator for manufacturing, research, invention and reactions")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "industry.db")]
    database: PathBuf,

    /// Path to the TOML configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log resolution steps
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load a small sample catalog and price sheet
    LoadSample,

    /// Import catalog fragments (*.toml) and price sheets (*.txt)
    Import {
        /// Directory to scan
        dir: PathBuf,

        /// Clear existing catalog data before import
        #[arg(long)]
        clear: bool,
    },

    /// List all blueprints in the database
    ListBlueprints,

    /// Show details for a specific blueprint
    Blueprint {
        /// Blueprint id or name
        id: String,
    },

    /// Plan the manufacture of an item
    Manufacture {
        /// Product id or name
        product: String,

        /// Units to build
        #[arg(short, long, default_value = "1")]
        units: f64,

        /// Material efficiency level (0-10); defaults to the owned blueprint
        #[arg(long)]
        me: Option<i32>,

        /// Time efficiency level (0-20); defaults to the owned blueprint
        #[arg(long)]
        te: Option<i32>,

        /// Manufacturing recursion depth (overrides config)
        #[arg(long)]
        depth: Option<u32>,

        /// Reaction recursion depth (overrides config)
        #[arg(long)]
        reaction_depth: Option<u32>,

        /// Obtain the blueprint by invention
        #[arg(long)]
        invented: bool,

        /// Decryptor used by the invention jobs
        #[arg(long, requires = "invented")]
        decryptor: Option<String>,

        /// Show the full process tree
        #[arg(long)]
        tree: bool,
    },

    /// Plan blueprint copies
    Copy {
        /// Blueprint id or name
        blueprint: String,

        /// Number of copies
        #[arg(long, default_value = "1")]
        copies: u32,

        /// Runs per copy; defaults to the blueprint's limit
        #[arg(long)]
        runs: Option<u32>,
    },

    /// Plan material efficiency research
    ResearchMe {
        blueprint: String,
        start: i32,
        end: i32,
    },

    /// Plan time efficiency research
    ResearchTe {
        blueprint: String,
        start: i32,
        end: i32,
    },

    /// Plan invention attempts
    Invent {
        /// Inventing blueprint or relic
        blueprint: String,

        /// Blueprint to invent
        #[arg(long)]
        target: Option<String>,

        #[arg(long)]
        decryptor: Option<String>,

        #[arg(long, default_value = "1")]
        attempts: u32,
    },

    /// Plan the cheapest reaction chain for an item
    React {
        /// Item id or name
        item: String,

        /// Units to produce
        #[arg(short, long, default_value = "1")]
        units: f64,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_secs())
}

/// Accept a numeric type id or an exact item name.
fn lookup(catalog: &MemoryCatalog, arg: &str) -> Result<TypeId> {
    if let Ok(id) = arg.parse::<u32>() {
        return Ok(TypeId(id));
    }
    match catalog.find_by_name(arg) {
        Some(id) => Ok(id),
        None => bail!("no item named '{arg}'"),
    }
}

/// Everything a planning command needs, loaded once
struct Session {
    config: Config,
    catalog: MemoryCatalog,
    prices: PriceBook,
    character: CharacterProfile,
    modifier: IndustryModifier,
}

impl Session {
    fn load(conn: &Connection, config: Config) -> Result<Self> {
        let catalog = db::load_catalog(conn)?;
        if catalog.blueprints().next().is_none() && catalog.reactions().next().is_none() {
            bail!("No recipes in database. Run 'import' or 'load-sample' first.");
        }
        let prices = db::load_prices(conn)?;
        let character = config.character();
        let modifier = config.modifier();
        Ok(Self {
            config,
            catalog,
            prices,
            character,
            modifier,
        })
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, &self.prices, &self.character, &self.modifier)
            .with_settings(self.config.resolver_settings())
    }

    fn valuation(&self) -> Valuation<'_> {
        Valuation {
            catalog: &self.catalog,
            pricing: &self.prices,
            sell_tax_factor: self.character.sell_tax_factor(),
            buy: self.config.buy_context(),
            sell: self.config.sell_context(),
        }
    }

    fn print(&self, node: &ProcessNode, title: &str, tree: bool) {
        if tree {
            println!("Process tree:\n");
            println!("{}", report::format_process_tree(node, &self.catalog, 0));
        }
        let summary = report::summarize_plan(node, title, &self.valuation(), &self.character);
        println!("{}", summary);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("opening {}", cli.database.display()))?;
    db::init_schema(&conn)?;
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }

        Commands::Import { dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog_data(&conn)?;
            }

            let stats = import::import_directory(&conn, &dir, now_secs()?)?;
            println!("\n{}", stats);
        }

        Commands::ListBlueprints => {
            let blueprints = db::list_blueprints(&conn)?;
            if blueprints.is_empty() {
                println!("No blueprints in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:>10}  {:<36} {}", "ID", "Blueprint", "Product");
                println!("{}", "-".repeat(72));
                for (id, name, product) in blueprints {
                    println!("{:>10}  {:<36} {}", id, name, product.unwrap_or_default());
                }
            }
        }

        Commands::Blueprint { id } => {
            let catalog = db::load_catalog(&conn)?;
            let id = lookup(&catalog, &id)?;
            show_blueprint(&catalog, id)?;
        }

        Commands::Manufacture {
            product,
            units,
            me,
            te,
            depth,
            reaction_depth,
            invented,
            decryptor,
            tree,
        } => {
            let session = Session::load(&conn, config)?;
            let product = lookup(&session.catalog, &product)?;
            let mut budget = session.config.recursion_budget();
            if let Some(depth) = depth {
                budget.manufacture = depth;
            }
            if let Some(depth) = reaction_depth {
                budget.reaction = depth;
            }

            let resolver = session.resolver();
            let node = if invented {
                let decryptor = decryptor
                    .map(|d| lookup(&session.catalog, &d))
                    .transpose()?;
                resolver.manufacture_invented(product, units, decryptor, budget)?
            } else {
                let levels = match (me, te) {
                    (None, None) => None,
                    (me, te) => Some(BlueprintLevels::new(-me.unwrap_or(0), -te.unwrap_or(0))),
                };
                resolver.manufacture(product, units, levels, budget)?
            };
            let title = format!("{units} x {}", session.catalog.name(product));
            session.print(&node, &title, tree);
        }

        Commands::Copy {
            blueprint,
            copies,
            runs,
        } => {
            let session = Session::load(&conn, config)?;
            let blueprint = lookup(&session.catalog, &blueprint)?;
            let runs = runs.map_or(CopyRuns::Max, CopyRuns::Exact);
            let node = session.resolver().copy(
                blueprint,
                copies,
                runs,
                session.config.recursion_budget(),
            )?;
            let title = format!("{copies} copies of {}", session.catalog.name(blueprint));
            session.print(&node, &title, true);
        }

        Commands::ResearchMe {
            blueprint,
            start,
            end,
        } => {
            let session = Session::load(&conn, config)?;
            let blueprint = lookup(&session.catalog, &blueprint)?;
            let node = session.resolver().research_me(
                blueprint,
                start,
                end,
                session.config.recursion_budget(),
            )?;
            let title = format!("ME {start} -> {end} on {}", session.catalog.name(blueprint));
            session.print(&node, &title, true);
        }

        Commands::ResearchTe {
            blueprint,
            start,
            end,
        } => {
            let session = Session::load(&conn, config)?;
            let blueprint = lookup(&session.catalog, &blueprint)?;
            let node = session.resolver().research_te(
                blueprint,
                start,
                end,
                session.config.recursion_budget(),
            )?;
            let title = format!("TE {start} -> {end} on {}", session.catalog.name(blueprint));
            session.print(&node, &title, true);
        }

        Commands::Invent {
            blueprint,
            target,
            decryptor,
            attempts,
        } => {
            let session = Session::load(&conn, config)?;
            let inventor = lookup(&session.catalog, &blueprint)?;
            let target = target.map(|t| lookup(&session.catalog, &t)).transpose()?;
            let decryptor = decryptor
                .map(|d| lookup(&session.catalog, &d))
                .transpose()?;
            let node = session.resolver().invent_attempts(
                inventor,
                target,
                decryptor,
                attempts,
                session.config.recursion_budget(),
            )?;
            let title = format!("{attempts} invention attempts from {}", session.catalog.name(inventor));
            session.print(&node, &title, true);
        }

        Commands::React { item, units } => {
            let session = Session::load(&conn, config)?;
            let item = lookup(&session.catalog, &item)?;
            let node = session
                .resolver()
                .best_reaction(item, units, session.config.recursion_budget())?;
            let title = format!("{units} x {}", session.catalog.name(item));
            session.print(&node, &title, true);
        }
    }

    Ok(())
}

fn show_blueprint(catalog: &MemoryCatalog, id: TypeId) -> Result<()> {
    let blueprint = catalog.blueprint(id)?;
    println!("Blueprint: {}", catalog.name(id));
    println!("  ID: {}", id);
    println!("  Max runs per copy: {}", blueprint.max_production_limit);

    for activity in RecipeActivity::ALL {
        let Some(data) = blueprint.activity(activity) else {
            continue;
        };
        println!("  {} ({}):", activity, report::format_duration(f64::from(data.time)));
        if let (RecipeActivity::Manufacturing, Some(m)) = (activity, &blueprint.manufacturing) {
            println!("    Produces {} x {}", m.portion_size, catalog.name(m.product));
        }
        if let (RecipeActivity::Inventing, Some(inv)) = (activity, &blueprint.invention) {
            for product in &inv.products {
                println!(
                    "    Invents {} ({:.0}% base, {} runs)",
                    catalog.name(*product),
                    inv.base_probability * 100.0,
                    inv.base_runs
                );
            }
        }
        for (item, qty) in data.materials.iter() {
            println!("    {} x {}", qty, catalog.name(item));
        }
        for (skill, level) in data.skills.iter() {
            println!("    requires {} {}", catalog.name(skill), level);
        }
    }
    Ok(())
}

/// Seed the database with the bundled sample catalog, priced as of now
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog_data(conn)?;

    let catalog = sample::catalog();
    db::store_catalog(conn, &catalog)?;

    let now = now_secs()?;
    let quotes = sample::price_quotes();
    for (kind, item, region, price) in &quotes {
        db::upsert_price(conn, *kind, *item, *region, *price, now)?;
    }

    println!(
        "Loaded {} blueprints, {} reactions and {} prices",
        catalog.blueprints().count(),
        catalog.reactions().count(),
        quotes.len()
    );
    Ok(())
}
