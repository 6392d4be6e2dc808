//! Edutrack CLI - provision and inspect the education-management database

use anyhow::Context;
use clap::{Parser, Subcommand};
use edutrack::config::{self, EdutrackConfig};
use edutrack::embedding::HalfVector;
use edutrack::output::{emit_json, OutputFormat};
use edutrack::query::ImageSearch;
use edutrack::storage::migrations::{self, MIGRATIONS};
use edutrack::storage::SqliteStore;
use edutrack::ui::{self, Icons};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "edutrack")]
#[command(version)]
#[command(about = "Education-management data store: schema, migrations and image similarity search")]
#[command(long_about = r#"
Edutrack owns the SQLite schema of a classroom application:
  • Users, curricula, paper analyses and practice progress
  • Gamification, quizzes, notifications and parent links
  • Image embeddings with an HNSW cosine index

Example usage:
  edutrack init
  edutrack status
  edutrack import-embeddings images.jsonl
  edutrack similar --image-id 42 --top-k 5
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./edutrack.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create a migrated database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Apply pending schema migrations
    Migrate,

    /// Show the schema version and pending migrations
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the DDL of every migration
    Schema,

    /// Show row counts per table
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Load image embeddings from a JSON Lines file
    ImportEmbeddings {
        /// File with one {"file_name", "image_path", "embedding"} object per line
        file: PathBuf,
    },

    /// Find images similar to a stored image or a query vector
    Similar {
        /// Id of a stored image to use as the query
        #[arg(long, conflicts_with = "vector_file", required_unless_present = "vector_file")]
        image_id: Option<i64>,

        /// JSON file holding the query vector as an array of numbers
        #[arg(long)]
        vector_file: Option<PathBuf>,

        /// Maximum number of matches
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Drop matches below this similarity
        #[arg(long)]
        min_similarity: Option<f64>,

        /// Rank every stored vector instead of using the HNSW index
        #[arg(long)]
        exact: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();
    let database = resolve_database(cli.database.as_deref(), &settings);

    match cli.command {
        Commands::Init { force } => {
            let settings = EdutrackConfig {
                database: Some(database.to_string_lossy().to_string()),
                ..settings
            };
            config::write_config(&config_path, &settings, force)?;
            config::ensure_db_dir(&database)?;

            let store = SqliteStore::open(&database)?;
            ui::header("Edutrack initialised");
            ui::info("Config", &config_path.display().to_string());
            ui::info("Database", &database.display().to_string());
            ui::info("Schema version", &store.schema_version()?.to_string());
        }

        Commands::Migrate => {
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open_unmigrated(&database)?;
            let applied = store.migrate()?;
            if applied.is_empty() {
                ui::success(&format!("Schema is up to date (version {})", store.schema_version()?));
            } else {
                for version in &applied {
                    println!("{} Applied migration {}", Icons::MIGRATE, version);
                }
                ui::success(&format!("Migrated to version {}", store.schema_version()?));
            }
        }

        Commands::Status { format } => {
            let (current, pending): (u32, Vec<u32>) = if database.exists() {
                let store = SqliteStore::open_unmigrated(&database)?;
                let pending = store.pending_migrations()?.iter().map(|m| m.version).collect();
                (store.schema_version()?, pending)
            } else {
                ui::warn(&format!("No database at {}", database.display()));
                (0, MIGRATIONS.iter().map(|m| m.version).collect())
            };

            if format.is_text() {
                ui::header(&format!("Schema status ({})", database.display()));
                ui::info("Current version", &current.to_string());
                ui::info("Latest version", &migrations::latest_version().to_string());
                println!("{}", ui::migrations_table(MIGRATIONS, current));
                if pending.is_empty() {
                    ui::success("Up to date");
                } else {
                    ui::warn(&format!("{} pending migration(s); run `edutrack migrate`", pending.len()));
                }
            } else {
                emit_json(&serde_json::json!({
                    "database": database,
                    "current_version": current,
                    "latest_version": migrations::latest_version(),
                    "pending": pending,
                }))?;
            }
        }

        Commands::Schema => {
            print!("{}", migrations::render_sql());
        }

        Commands::Stats { format } => {
            let store = open_existing(&database)?;
            let stats = store.stats()?;
            if format.is_text() {
                ui::header(&format!("Edutrack statistics ({})", database.display()));
                ui::info("Schema version", &stats.schema_version.to_string());
                println!("{}", ui::stats_table(&stats));
            } else {
                emit_json(&stats)?;
            }
        }

        Commands::ImportEmbeddings { file } => {
            let store = open_existing(&database)?;
            let total = std::fs::metadata(&file)
                .with_context(|| format!("cannot read {}", file.display()))?
                .len();

            ui::header(&format!("Importing {}", file.display()));
            let started = Instant::now();
            let progress = ui::ImportProgress::new(total);
            let summary = edutrack::import::import_embeddings(&store, &file, |msg| progress.update(msg))?;
            progress.finish_with_summary(started.elapsed(), &summary);
        }

        Commands::Similar { image_id, vector_file, top_k, min_similarity, exact, format } => {
            let store = open_existing(&database)?;
            let query = match (image_id, vector_file) {
                (Some(id), _) => store
                    .get_image(id)?
                    .and_then(|image| image.embedding)
                    .with_context(|| format!("image {} has no stored embedding", id))?,
                (None, Some(path)) => read_vector(&path)?,
                (None, None) => anyhow::bail!("pass --image-id or --vector-file"),
            };
            let top_k = top_k.unwrap_or(settings.search.top_k);
            let min_similarity = min_similarity.unwrap_or(settings.search.min_similarity);

            let started = Instant::now();
            let matches = if exact {
                let mut matches = store.nearest_images_exact(&query, top_k)?;
                matches.retain(|m| m.similarity >= min_similarity);
                matches
            } else {
                let spinner = ui::Spinner::new("Building HNSW index");
                let search = ImageSearch::build(&store, settings.search.hnsw_params())?;
                spinner.finish_and_clear();
                search.similar(&query, top_k, min_similarity)?
            };

            if !format.is_text() {
                emit_json(&matches)?;
            } else if matches.is_empty() {
                ui::warn("No similar images found.");
            } else {
                ui::section(&format!(" {} {} match(es) ", Icons::SEARCH, matches.len()));
                println!("{}", ui::matches_table(&matches));
                if let Some(best) = matches.first() {
                    println!(
                        "{} {}",
                        ui::dim("Best match:"),
                        best.file_name.style(ui::theme().for_similarity(best.similarity).clone())
                    );
                }
                ui::timing(&format!("{:.2?}", started.elapsed()));
            }
        }
    }

    Ok(())
}

/// `--database`, then the config file, then `.edutrack/edutrack.db` here
fn resolve_database(flag: Option<&Path>, settings: &EdutrackConfig) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    match &settings.database {
        Some(path) => PathBuf::from(path),
        None => config::default_database_path_in(Path::new(".")),
    }
}

fn open_existing(database: &Path) -> anyhow::Result<SqliteStore> {
    if !database.exists() {
        anyhow::bail!("no database at {} (run `edutrack init` first)", database.display());
    }
    Ok(SqliteStore::open(database)?)
}

fn read_vector(path: &Path) -> anyhow::Result<HalfVector> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let values: Vec<f32> = serde_json::from_str(&contents)?;
    Ok(HalfVector::from_f32(&values)?)
}
