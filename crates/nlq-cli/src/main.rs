//! nlq command-line interface
//!
//! ```bash
//! nlq scan --db-type sqlite --database school.db
//! nlq ask "count how many classes exist" --db-type sqlite --database school.db
//! nlq run "show me students whose surname starts with A" --db-type sqlite --database school.db
//! nlq check "DELETE FROM students" --dialect sqlite
//! nlq classify "top 5 students sorted by surname" --schema-file schema.txt
//! ```
//!
//! Server passwords are read from `NLQ_DB_PASSWORD`, never from arguments.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use nlq_command::{CommandProcessor, SchemaDocument};
use nlq_core::{DatabaseType, Dialect, NlqConfig};
use nlq_reasoner::{SqlValidator, ValidationMode};
use nlq_schema::ConnectionParams;
use nlq_session::{AskOptions, QuerySession};
use nlq_telemetry::init_telemetry;
use serde_json::json;
use std::path::{Path, PathBuf};

const PASSWORD_ENV: &str = "NLQ_DB_PASSWORD";

#[derive(Parser)]
#[command(name = "nlq", version, about = "Natural-language questions over SQL databases")]
struct Cli {
    /// Config file (defaults to nlq.toml in this or a parent directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect, generate a schema snapshot and print it
    Scan {
        #[command(flatten)]
        db: DbArgs,

        /// Write schema.txt and schema_metadata.json here
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the metadata sidecar instead of the schema text
        #[arg(long)]
        metadata: bool,
    },

    /// Translate a request into SQL without running it
    Ask(AskArgs),

    /// Translate a request and run the SQL if it is safe to execute
    Run(AskArgs),

    /// Validate one SQL statement
    Check {
        sql: String,

        #[arg(long, default_value = "generic")]
        dialect: String,

        /// Regex extraction only, without parsing
        #[arg(long)]
        regex: bool,
    },

    /// Show how the command processor reads a request
    Classify {
        text: String,

        /// Schema text file used to recognize tables and columns
        #[arg(long)]
        schema_file: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Default)]
struct DbArgs {
    /// mysql, postgres or sqlite
    #[arg(long = "db-type")]
    db_type: Option<String>,

    /// Database name, or the file path for SQLite
    #[arg(long)]
    database: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    user: Option<String>,
}

impl DbArgs {
    fn target(&self) -> Result<Option<(DatabaseType, ConnectionParams)>> {
        let Some(db_type) = self.db_type.as_deref() else {
            return Ok(None);
        };
        let db_type: DatabaseType = db_type.parse()?;
        let database = self
            .database
            .clone()
            .ok_or_else(|| anyhow!("--database is required with --db-type"))?;

        let params = ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: std::env::var(PASSWORD_ENV).ok(),
            database,
        };
        Ok(Some((db_type, params)))
    }
}

#[derive(Args)]
struct AskArgs {
    text: String,

    #[arg(long)]
    dialect: Option<String>,

    /// Restrict the prompt to these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,

    #[arg(long)]
    allow_destructive: bool,

    /// Schema text to use when no database is given
    #[arg(long)]
    schema_file: Option<PathBuf>,

    #[command(flatten)]
    db: DbArgs,
}

impl AskArgs {
    fn options(&self) -> AskOptions {
        let mut options = AskOptions::default().allow_destructive(self.allow_destructive);
        if let Some(dialect) = &self.dialect {
            options = options.dialect(dialect.clone());
        }
        if !self.tables.is_empty() {
            options = options.tables(self.tables.clone());
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NlqConfig::load_from(path)?,
        None => NlqConfig::load()?,
    };
    init_telemetry(&config.observability);

    match cli.command {
        Commands::Scan {
            db,
            output_dir,
            metadata,
        } => {
            if output_dir.is_some() {
                config.schema.output_dir = output_dir;
            }
            let session = open_session(&config, &db, None).await?;
            let snapshot = session
                .schema()
                .snapshot()
                .ok_or_else(|| anyhow!("No schema snapshot was generated"))?;

            if metadata {
                println!("{}", serde_json::to_string_pretty(&snapshot.metadata())?);
            } else {
                println!("{}", snapshot.text);
            }
        }

        Commands::Ask(args) => {
            let mut session = open_session(&config, &args.db, args.schema_file.as_deref()).await?;
            let output = session.ask(&args.text, args.options()).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Run(args) => {
            let mut session = open_session(&config, &args.db, args.schema_file.as_deref()).await?;
            if !session.schema().is_connected() {
                bail!("run needs a database connection (--db-type and --database)");
            }

            let output = session.ask(&args.text, args.options()).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);

            let outcome = session
                .execute(&output)
                .await
                .context("Statement was not executed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Commands::Check {
            sql,
            dialect,
            regex,
        } => {
            let mode = if regex {
                ValidationMode::Regex
            } else {
                ValidationMode::Ast
            };
            let validation = SqlValidator::new(mode).validate(&sql, Dialect::parse(&dialect));
            let report = json!({
                "ok": validation.ok,
                "destructive": validation.destructive,
                "warnings": validation.warnings,
                "metadata": validation.metadata,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Classify { text, schema_file } => {
            let mut processor = CommandProcessor::new();
            if let Some(path) = schema_file {
                processor = processor.with_schema(SchemaDocument::load(&path)?);
            }
            println!("{}", serde_json::to_string_pretty(&processor.process(&text))?);
        }
    }

    Ok(())
}

async fn open_session(
    config: &NlqConfig,
    db: &DbArgs,
    schema_file: Option<&Path>,
) -> Result<QuerySession> {
    let mut session = QuerySession::from_config(config)?;

    if let Some((db_type, params)) = db.target()? {
        if !session.connect(db_type, &params).await {
            let reason = session.schema().last_error().unwrap_or("unknown error");
            bail!("Could not connect: {}", reason);
        }
    } else if let Some(path) = schema_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        session.use_schema_text(&text);
    }

    tracing::debug!(
        session_id = %session.id(),
        backend = %session.reasoner().backend_label(),
        "Session ready"
    );
    Ok(session)
}
