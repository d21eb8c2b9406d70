use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use text_to_sql::config::Settings;
use text_to_sql::db::{init_pool, seed::seed_sample_data};
use text_to_sql::export;
use text_to_sql::logging;
use text_to_sql::models::Question;
use text_to_sql::schema::SchemaIntrospector;
use text_to_sql::server::Server;
use text_to_sql::translator::default_rules;
use text_to_sql::QueryService;
use tracing::info;

#[derive(Parser)]
#[command(name = "text-to-sql")]
#[command(about = "Rule-based natural language to SQL over a SQLite database")]
#[command(version)]
struct Cli {
    /// SQLite URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log statements as they are executed (overrides DATABASE_ECHO)
    #[arg(long, global = true)]
    echo_sql: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate a question and print the SQL
    Generate {
        question: String,
    },

    /// Translate a question and run it
    Execute {
        question: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the live schema as JSON
    Schema,

    /// Print the rule table in precedence order
    Rules,

    /// Create and populate the sample database
    Seed {
        /// Replace existing tables
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    if cli.echo_sql {
        settings.echo_sql = true;
    }

    logging::init(&settings.log_level);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }

            let service = connect(&settings).await?;
            info!(
                classifier_ready = service.classifier_ready(),
                rules = service.rules().len(),
                "Query service ready"
            );

            let server = Server::bind(&settings.bind_addr(), Arc::new(service), settings.read_timeout)
                .await
                .with_context(|| format!("Failed to bind {}", settings.bind_addr()))?;
            server.serve().await?;
        }
        Commands::Generate { question } => {
            let service = connect(&settings).await?;
            let response = service.generate(&Question::new(question));
            if let Some(error) = response.error {
                bail!(error);
            }
            println!("-- rule: {}", response.rule_id.unwrap_or("?"));
            println!("{}", response.sql);
        }
        Commands::Execute { question, format } => {
            let service = connect(&settings).await?;
            let response = service.execute(&Question::new(question)).await;

            eprintln!("-- {}", response.sql);
            if let Some(error) = &response.error {
                bail!("{}", error);
            }
            let Some(outcome) = &response.results else {
                bail!("no results");
            };

            match format {
                OutputFormat::Table => println!("{}", export::to_table(outcome)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
                OutputFormat::Csv => print!("{}", export::to_csv(outcome)?),
            }
            eprintln!("-- {:.4}s", response.elapsed);
        }
        Commands::Schema => {
            let service = connect(&settings).await?;
            let schema = service.schema().await?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Rules => {
            // The rule table is static; no database is needed to list it.
            println!("{}", export::rules_table(&default_rules().summaries()));
        }
        Commands::Seed { force } => {
            let pool = init_pool(&settings).await?;
            let existing = SchemaIntrospector::new(pool.clone()).describe().await?;
            if !existing.is_empty() && !force {
                bail!(
                    "{} already has {} tables; pass --force to replace them",
                    settings.database_url,
                    existing.len()
                );
            }

            let summary = seed_sample_data(&pool).await?;
            info!(tables = summary.tables, rows = summary.rows, "Sample database seeded");
            println!(
                "Seeded {} tables ({} rows) into {}",
                summary.tables, summary.rows, settings.database_url
            );
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> Result<QueryService> {
    let pool = init_pool(settings)
        .await
        .with_context(|| format!("Failed to open {}", settings.database_url))?;
    Ok(QueryService::from_pool(pool, settings.echo_sql))
}
