#![deny(unsafe_code)]

//! PromptStack CLI: run the assist engine against prompt files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use promptstack_config::AppConfig;
use promptstack_core::context::{
    CandidateSource, ContextAssembler, ContextSource, DocumentMeta, ScoredItem, StaticPool,
    TokenBudget,
};
use promptstack_core::llm::create_transport;
use promptstack_core::suggestion::{
    Suggestion, SuggestionsResponse, apply_edits, generate_unified_diff, parse_suggestions_response,
};
use promptstack_core::{
    Buffer, Clock, Coordinator, CoordinatorConfig, ModelRegistry, SystemClock, extract_keywords,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// PromptStack: context-aware AI suggestions for prompt documents.
#[derive(Parser)]
#[command(name = "promptstack", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "promptstack.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the keywords extracted from a document.
    Keywords {
        file: PathBuf,
        /// Show only the N most frequent keywords.
        #[arg(long)]
        top: Option<usize>,
    },

    /// Show the document's token budget status.
    Budget { file: PathBuf },

    /// Show the context that would be sent with a document.
    Context {
        file: PathBuf,
        #[command(flatten)]
        pools: PoolArgs,
    },

    /// Render each suggestion in a saved response as a unified diff.
    Diff {
        file: PathBuf,
        /// JSON response from the model.
        #[arg(long)]
        response: PathBuf,
        /// Print the parsed suggestions as JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Apply one suggestion from a saved response.
    Apply {
        file: PathBuf,
        #[arg(long)]
        response: PathBuf,
        /// 1-based position of the suggestion in the response.
        #[arg(long)]
        index: usize,
        /// Write the result back to FILE instead of printing it.
        #[arg(long)]
        write: bool,
    },

    /// Ask the model for suggestions (Ctrl-C cancels).
    Suggest {
        file: PathBuf,
        #[command(flatten)]
        pools: PoolArgs,
        #[arg(long)]
        json: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(Args)]
struct PoolArgs {
    /// TOML file of library prompts (`[[items]]`).
    #[arg(long)]
    library: Option<PathBuf>,

    /// TOML file of history entries (`[[items]]`).
    #[arg(long)]
    history: Option<PathBuf>,

    /// Document tag (repeatable).
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    category: Option<String>,

    /// Library prompt the document was created from.
    #[arg(long)]
    origin: Option<String>,
}

impl PoolArgs {
    fn meta(&self) -> DocumentMeta {
        let mut meta = DocumentMeta::default()
            .with_tags(self.tags.iter().cloned())
            .with_category(self.category.clone().unwrap_or_default());
        if let Some(origin) = &self.origin {
            meta = meta.with_origin(origin.clone());
        }
        meta
    }

    async fn load(&self) -> Result<(StaticPool, StaticPool)> {
        Ok((load_pool(self.library.as_deref()).await?, load_pool(self.history.as_deref()).await?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose, &config.logging.level))),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Keywords { file, top } => cmd_keywords(&file, top).await?,
        Commands::Budget { file } => cmd_budget(&config, &file).await?,
        Commands::Context { file, pools } => cmd_context(&config, &file, &pools).await?,
        Commands::Diff {
            file,
            response,
            json,
        } => cmd_diff(&config, &file, &response, json).await?,
        Commands::Apply {
            file,
            response,
            index,
            write,
        } => cmd_apply(&file, &response, index, write).await?,
        Commands::Suggest { file, pools, json } => cmd_suggest(&config, &file, &pools, json).await?,
        Commands::Config { show } => cmd_config(&config, &cli.config, show)?,
    }

    Ok(())
}

/// `-v` wins over the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

async fn cmd_keywords(file: &Path, top: Option<usize>) -> Result<()> {
    let text = read_document(file).await?;
    let keywords = extract_keywords(&text);
    match top {
        Some(n) => {
            for word in keywords.top(n) {
                println!("{word}\t{}", keywords.frequency(word));
            }
        }
        None => {
            for (word, count) in keywords.iter() {
                println!("{word}\t{count}");
            }
        }
    }
    Ok(())
}

async fn cmd_budget(config: &AppConfig, file: &Path) -> Result<()> {
    let text = read_document(file).await?;
    let budget = budget_for(config);
    let check = budget.check_document(&text);
    println!("Model: {} ({} token window)", config.model.name, budget.window_size());
    println!("{}", budget.document_status(&text));
    println!(
        "Limits: document {}, library {}, history {}",
        check.limit,
        budget.cap_for(ContextSource::Library),
        budget.cap_for(ContextSource::History)
    );
    if check.at_block {
        bail!("document is over budget, suggestions are blocked");
    }
    Ok(())
}

async fn cmd_context(config: &AppConfig, file: &Path, pools: &PoolArgs) -> Result<()> {
    let text = read_document(file).await?;
    let (library, history) = pools.load().await?;
    let budget = budget_for(config);
    let assembler = ContextAssembler::from_config(&config.context);
    let selection = assembler.assemble(
        &extract_keywords(&text),
        &pools.meta(),
        &library.list_candidates(),
        &history.list_candidates(),
        &budget,
        SystemClock.now(),
    );

    print_pool("Library", &selection.library);
    print_pool("History", &selection.history);
    println!("{}", budget.context_status(&selection.library, ContextSource::Library));
    println!("{}", budget.context_status(&selection.history, ContextSource::History));
    Ok(())
}

fn print_pool(label: &str, items: &[ScoredItem]) {
    println!("{label}:");
    if items.is_empty() {
        println!("  (none)");
    }
    for scored in items {
        println!(
            "  {} {:?} score={} tokens={}",
            scored.item.id, scored.item.title, scored.score, scored.tokens
        );
        for reason in &scored.reasons {
            println!("    - {reason}");
        }
    }
}

async fn cmd_diff(config: &AppConfig, file: &Path, response: &Path, json: bool) -> Result<()> {
    let text = read_document(file).await?;
    let parsed = read_response(response).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&parsed.suggestions)?);
        return Ok(());
    }
    if let Some(summary) = &parsed.summary {
        println!("{summary}\n");
    }
    for (i, suggestion) in parsed.suggestions.iter().enumerate() {
        print_suggestion_header(i + 1, suggestion);
        match generate_unified_diff(&text, &suggestion.edits, config.context.diff_context_lines) {
            Ok(diff) if diff.is_noop() => println!("(no changes)\n"),
            Ok(diff) => println!("{diff}"),
            Err(e) => println!("cannot preview: {e}\n"),
        }
    }
    Ok(())
}

async fn cmd_apply(file: &Path, response: &Path, index: usize, write: bool) -> Result<()> {
    let text = read_document(file).await?;
    let parsed = read_response(response).await?;
    let suggestion = index
        .checked_sub(1)
        .and_then(|i| parsed.suggestions.get(i))
        .with_context(|| {
            format!(
                "no suggestion {index} (response has {})",
                parsed.suggestions.len()
            )
        })?;

    let updated = apply_edits(&text, &suggestion.edits)
        .with_context(|| format!("failed to apply {:?}", suggestion.title))?;
    if write {
        tokio::fs::write(file, &updated)
            .await
            .with_context(|| format!("failed to write {}", file.display()))?;
        info!(path = %file.display(), suggestion = %suggestion.title, "Suggestion applied");
    } else {
        print!("{updated}");
    }
    Ok(())
}

async fn cmd_suggest(config: &AppConfig, file: &Path, pools: &PoolArgs, json: bool) -> Result<()> {
    let text = read_document(file).await?;
    let (library, history) = pools.load().await?;
    let models = ModelRegistry::from_config(&config.model);
    let transport = create_transport(&config.llm, &config.model.name)?;

    let (mut coordinator, mut events) = Coordinator::new(
        Box::new(Buffer::new(text)),
        CoordinatorConfig::from_app_config(config, &models),
        Arc::new(transport),
        Box::new(library),
        Box::new(history),
    );

    for line in coordinator.budget_status().iter().take(1) {
        eprintln!("{line}");
    }
    coordinator.request_suggestions(&pools.meta())?;
    eprintln!("Requesting suggestions from {}...", config.model.name);

    let event = tokio::select! {
        event = events.recv() => event,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling request");
            coordinator.cancel_request();
            eprintln!("Request cancelled.");
            return Ok(());
        }
    };
    let Some(event) = event else {
        bail!("request task ended without a result");
    };
    coordinator.handle_event(event)?;

    if json {
        println!("{}", serde_json::to_string_pretty(coordinator.suggestions())?);
        return Ok(());
    }
    for line in coordinator.budget_status().iter().skip(1) {
        eprintln!("{line}");
    }
    if let Some(summary) = coordinator.summary() {
        println!("{summary}\n");
    }
    if coordinator.suggestions().is_empty() {
        println!("No suggestions.");
    }
    for (i, suggestion) in coordinator.suggestions().iter().enumerate() {
        print_suggestion_header(i + 1, suggestion);
        match coordinator.preview(&suggestion.id) {
            Ok(diff) => println!("{diff}"),
            Err(e) => println!("cannot preview: {e}\n"),
        }
    }
    Ok(())
}

fn print_suggestion_header(position: usize, suggestion: &Suggestion) {
    println!(
        "[{position}] {} ({})",
        suggestion.display_title(),
        suggestion.kind.label()
    );
    if !suggestion.description.is_empty() {
        println!("    {}", suggestion.description);
    }
}

fn cmd_config(config: &AppConfig, config_path: &Path, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn budget_for(config: &AppConfig) -> TokenBudget {
    let window = ModelRegistry::from_config(&config.model).context_window_size(&config.model.name);
    TokenBudget::new(window, (&config.budget).into())
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

async fn load_pool(path: Option<&Path>) -> Result<StaticPool> {
    match path {
        Some(path) => StaticPool::load(path)
            .await
            .with_context(|| format!("failed to load pool {}", path.display())),
        None => Ok(StaticPool::default()),
    }
}

async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_response(path: &Path) -> Result<SuggestionsResponse> {
    let raw = read_document(path).await?;
    parse_suggestions_response(&raw, SystemClock.now())
        .with_context(|| format!("invalid response in {}", path.display()))
}
