use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use newscheck_agents::{PromptKind, PromptSet};
use newscheck_common::{AppConfig, Article, FileConfig};
use newscheck_models::ModelContext;
use newscheck_pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "newscheck", about = "Fake-news detection for Spanish news articles")]
struct Cli {
    /// Path to config TOML file (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and print the report as JSON
    Run {
        #[arg(long)]
        headline: String,
        #[arg(long, conflicts_with = "body_file", required_unless_present = "body_file")]
        body: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// News domain of the article (0-10)
        #[arg(long)]
        domain: Option<u32>,
    },
    /// Dominant topic of a text
    Topic { text: String },
    /// Probability that a text is real news
    Score {
        text: String,
        #[arg(long)]
        domain: Option<u32>,
    },
    /// Print the agent prompt templates in effect
    Prompts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            headline,
            body,
            body_file,
            domain,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("either --body or --body-file is required"),
            };
            let mut article = Article::new(headline, body);
            if let Some(domain) = domain {
                article = article.with_domain(domain);
            }

            let app = AppConfig::from_env();
            let pipeline = Pipeline::from_config(&config, &app).await?;
            let report = pipeline.run_pipeline(&article).await?;
            info!(run_id = %report.run_id, category = %report.verdict.category, "Done");
            println!("{}", report.to_json()?);
        }
        Command::Topic { text } => {
            let models = ModelContext::load(&config).await?;
            let topic = models.topic.infer_topic(&text);
            println!("{}", serde_json::to_string_pretty(&topic)?);
        }
        Command::Score { text, domain } => {
            let models = ModelContext::load(&config).await?;
            let signal = models.veracity.score(&text, domain);
            println!("{}", serde_json::to_string_pretty(&signal)?);
        }
        Command::Prompts => {
            let prompts = PromptSet::load(&config.prompts)?;
            for kind in PromptKind::ALL {
                println!("=== {kind} ===");
                println!("{}\n", prompts.get(kind).template());
            }
        }
    }

    Ok(())
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("newscheck=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
