use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    lifematch_config::{DataConfig, LifematchConfig},
    lifematch_experiences::{
        ExperienceManager, ExperiencesConfig, Match, SearchRequest, ShardStore,
        embeddings_openai::OpenAiEmbeddingProvider,
    },
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt},
};

const PREVIEW_CHARS: usize = 300;

#[derive(Parser)]
#[command(name = "lifematch", version, about = "Find notable people who faced what you faced")]
struct Cli {
    /// Path to a lifematch.toml config file.
    #[arg(long, global = true, env = "LIFEMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Data root holding `celebrities/` and `vector_db/`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse and embed each person's experiences.txt, replacing their shard.
    Embed {
        #[arg(required = true)]
        people: Vec<String>,
    },
    /// Search the corpus for experiences similar to QUERY.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of matches to return (1-50).
        #[arg(long = "top", short = 'k')]
        top_k: Option<i64>,
    },
    /// Count shards and experiences.
    Stats,
    /// Run the HTTP search API.
    Serve {
        /// Address to bind, e.g. 0.0.0.0:5000.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<LifematchConfig> {
    let mut config =
        LifematchConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data = DataConfig::rooted_at(dir);
    }
    Ok(config)
}

fn build_manager(config: &LifematchConfig) -> anyhow::Result<ExperienceManager> {
    let embedder = OpenAiEmbeddingProvider::from_config(&config.embeddings)?;
    Ok(ExperienceManager::new(
        ExperiencesConfig::from(config),
        Box::new(embedder),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Embed { people } => embed(&config, &people).await,
        Command::Search { query, top_k } => search(&config, query.join(" "), top_k).await,
        Command::Stats => stats(&config).await,
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let manager = Arc::new(build_manager(&config)?);
            lifematch_gateway::serve(manager, &bind).await
        },
    }
}

async fn embed(config: &LifematchConfig, people: &[String]) -> anyhow::Result<()> {
    let manager = build_manager(config)?;
    let mut failed = Vec::new();

    for (i, person) in people.iter().enumerate() {
        info!(person = %person, "[{}/{}] embedding", i + 1, people.len());
        match manager.ingest_person(person).await {
            Ok(report) => println!(
                "✓ {}: {} experiences → {}",
                report.person,
                report.experiences,
                report.shard_path.display()
            ),
            Err(e) => {
                error!(person = %person, error = %e, "embedding failed");
                println!("✗ {person}: {e}");
                failed.push(person.as_str());
            },
        }
    }

    println!(
        "\n{} of {} succeeded",
        people.len() - failed.len(),
        people.len()
    );
    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("failed to embed: {}", failed.join(", "))
    }
}

async fn search(config: &LifematchConfig, query: String, top_k: Option<i64>) -> anyhow::Result<()> {
    let manager = build_manager(config)?;
    manager.reload().await;

    let response = manager.search(&SearchRequest::new(query, top_k)).await?;
    if response.matches.is_empty() {
        anyhow::bail!(
            "no matches found; is {} empty? Run `lifematch embed <PERSON>` first",
            manager.store().dir().display()
        );
    }

    println!("Query: \"{}\"\n", response.query);
    for (rank, m) in response.matches.iter().enumerate() {
        println!("{}", format_match(rank + 1, m));
    }
    Ok(())
}

async fn stats(config: &LifematchConfig) -> anyhow::Result<()> {
    let store = ShardStore::new(config.data.shard_dir.clone());
    let stats = store.stats().await;
    println!("Database:    {}", store.dir().display());
    println!("People:      {}", stats.total_people);
    println!("Experiences: {}", stats.total_experiences);
    if stats.corrupt_shards > 0 {
        println!("Corrupt:     {}", stats.corrupt_shards);
    }
    Ok(())
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut.trim_end())
}

fn format_match(rank: usize, m: &Match) -> String {
    let mut out = format!(
        "{rank}. {}\n   Similarity: {:.4}\n   Keywords: {}\n",
        m.person,
        m.similarity,
        m.keywords.join(", ")
    );
    if let Some(url) = &m.source_url {
        out.push_str(&format!("   Source: {url}\n"));
    }
    out.push_str(&format!("\n   {}\n", preview(&m.text)));
    out
}
