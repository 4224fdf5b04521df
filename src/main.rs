use anyhow::Result;
use clap::{Parser, Subcommand};
use recipe_finder::config::AppConfig;
use recipe_finder::display::render_table;
use recipe_finder::loader::RecipeLoader;
use recipe_finder::search::SearchService;
use recipe_finder::sql::{sanitize, to_count_query};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rows printed per answer in the interactive loop.
const REPL_MAX_ROWS: usize = 50;

#[derive(Parser)]
#[command(name = "recipe-finder")]
#[command(about = "Ask questions about a recipe database in plain English")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question and print the SQL and the rows
    Ask {
        question: String,

        /// Row limit hint passed to the model
        #[arg(short, long)]
        limit: Option<i64>,

        /// Path to the recipe database (default: $RECIPES_DB_PATH or data/recipes.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Interactive question loop; type `exit` to quit
    Repl {
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Create the schema and import the JSON recipe dump
    InitDb {
        /// JSON array of recipe objects
        #[arg(long, default_value = "data/recipes-en.json")]
        json: PathBuf,

        #[arg(long)]
        db: Option<PathBuf>,

        /// Delete existing rows before importing
        #[arg(long)]
        force: bool,
    },

    /// Print the sanitized form of model output
    Sanitize { text: String },

    /// Print the total-count query derived from a SELECT
    CountSql { sql: String },
}

fn load_config(db: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(db) = db {
        config.db_path = db;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ask {
            question,
            limit,
            db,
        } => {
            let config = load_config(db)?;
            let service = SearchService::from_config(&config)?;
            let response = service.search(&question, limit).await?;

            println!("SQL -> {}", response.sql);
            match response.total {
                Some(total) => println!("{} rows (total {})\n", response.count, total),
                None => println!("{} rows\n", response.count),
            }
            println!("{}", render_table(&response.results, response.results.len()));
        }
        Command::Repl { db } => {
            let config = load_config(db)?;
            if !config.db_path.exists() {
                anyhow::bail!(
                    "Database not found at {}. Run `recipe-finder init-db` first.",
                    config.db_path.display()
                );
            }
            let service = SearchService::from_config(&config)?.with_totals(false);
            run_repl(&service).await?;
        }
        Command::InitDb { json, db, force } => {
            let config = load_config(db)?;
            let mut loader = RecipeLoader::open(&config.db_path)?;
            let report = loader.import(&json, force)?;
            info!(db = %loader.db_path().display(), "Database ready");
            println!(
                "existing: {}, inserted: {}, total: {}{}",
                report.existing,
                report.inserted,
                report.total,
                if report.cleared { " (cleared first)" } else { "" }
            );
        }
        Command::Sanitize { text } => {
            println!("{}", sanitize(&text)?);
        }
        Command::CountSql { sql } => {
            let query = sanitize(&sql)?;
            println!("{}", to_count_query(&query)?);
        }
    }

    Ok(())
}

async fn run_repl(service: &SearchService) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Recipe Finder (type 'exit' to quit)");
    println!("What do you want to know about the recipes?");

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match service.search(input, None).await {
            Ok(response) => {
                println!("\nSQL -> {}", response.sql);
                println!("{}\n", render_table(&response.results, REPL_MAX_ROWS));
            }
            Err(e) => {
                error!(error = %e, "Question failed");
                println!("Error: {}\n", e);
            }
        }
    }
    Ok(())
}
