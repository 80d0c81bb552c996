use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vocab_translate::{
    Category, LibreTranslateEngine, MockEngine, MockMode, TranslationChain, TranslationConfig,
    TranslationEngine, TranslationResult,
};

#[derive(Parser)]
#[command(
    name = "vocab-translate",
    version,
    about = "English → Chinese lookups through the cached dictionary/neural fallback chain"
)]
struct Cli {
    /// TOML configuration file (defaults are used when it does not exist)
    #[arg(long, short, default_value = "config/translation.toml")]
    config: PathBuf,

    /// Use the mock engine instead of a LibreTranslate server
    #[arg(long, short)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a word, phrase or sentence
    Translate {
        text: String,

        /// word, phrase or sentence (inferred from the word count if omitted)
        #[arg(long, short = 't')]
        category: Option<Category>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which translation sources are available
    Sources,
    /// Show translation cache statistics
    Stats,
    /// Remove expired cache entries
    Sweep,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TranslationConfig::load(&cli.config)?;

    let engine: Arc<dyn TranslationEngine> = if cli.mock {
        Arc::new(MockEngine::new(MockMode::Suffix))
    } else {
        Arc::new(LibreTranslateEngine::from_config(&config.neural)?)
    };
    info!(engine = engine.engine_name(), "Starting vocab-translate");

    let chain = TranslationChain::from_config(config, engine);

    match cli.command {
        Commands::Translate {
            text,
            category,
            json,
        } => {
            let result = chain.translate(&text, category).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
            chain.persist_cache()?;
            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Sources => {
            let sources = chain.available_sources().await;
            println!("{}", serde_json::to_string_pretty(&sources)?);
            for descriptor in chain.secondary().descriptors() {
                println!(
                    "  [{}] {} ({})",
                    descriptor.priority,
                    descriptor.name,
                    match (&descriptor.load_error, descriptor.available) {
                        (Some(error), _) => error.as_str(),
                        (None, true) => "loaded",
                        (None, false) => "not loaded",
                    }
                );
            }
        }
        Commands::Stats => {
            println!("{}", serde_json::to_string_pretty(&chain.cache_stats())?);
        }
        Commands::Sweep => {
            let removed = chain.sweep_cache();
            chain.persist_cache()?;
            println!("Removed {} expired entries", removed);
        }
    }

    Ok(())
}

fn print_result(result: &TranslationResult) {
    match (&result.target_text, &result.error) {
        (Some(target), _) => {
            println!("{}", target);
            println!(
                "  {} · {} · confidence {:.2}",
                result.category,
                result
                    .origin
                    .map(|origin| origin.as_str())
                    .unwrap_or("unknown"),
                result.confidence_score
            );
        }
        (None, Some(error)) => eprintln!("No translation: {}", error),
        (None, None) => eprintln!("No translation"),
    }
}
