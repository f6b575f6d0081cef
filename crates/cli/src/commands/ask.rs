//! `resgenie ask`: Single-question or interactive staffing search.

use std::io::Write;
use std::sync::Arc;

use resgenie_config::AppConfig;
use resgenie_core::error::LookupError;
use resgenie_core::DocumentStore;
use resgenie_engine::{ConversationContext, MatchResult, Pipeline, PipelineOutcome, ResponseCache};
use resgenie_resolver::{LlmExtractor, TranslationSource};
use resgenie_store::{DirectoryDocument, FileStore, InMemoryStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  WARNING: No API key configured. Questions will be read with keyword rules only.");
        eprintln!("  Set RESGENIE_API_KEY (or ANTHROPIC_API_KEY / OPENAI_API_KEY) or edit:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
    }

    let router = resgenie_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    let extractor = Arc::new(
        LlmExtractor::new(provider, &config.default_model)
            .with_sampling(config.default_temperature, config.default_max_tokens),
    );

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("  {}", lookup_failure(&e));
            eprintln!("  Data file: {}", config.data_path().display());
            return Err(e.into());
        }
    };

    let pipeline = Pipeline::from_config(&config, extractor, store);
    let mut cache = config
        .cache
        .enabled
        .then(|| ResponseCache::new(config.cache.capacity));
    let mut context = ConversationContext::new();

    if let Some(question) = message {
        match pipeline.run(cache.as_mut(), &question, &mut context).await {
            Ok(outcome) => print!("{}", render(&outcome)),
            Err(e) => eprintln!("{}", lookup_failure(&e)),
        }
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        ResGenie — Interactive Search         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Data:      {} ({})", config.data_path().display(), config.store.backend);
    println!();
    println!("  Ask about people, e.g. \"partners in the nordics\".");
    println!("  Follow up with \"what about week 3?\". Type 'new' to start over,");
    println!("  'stats' for cache statistics, 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "new" | "reset" => {
                context.reset();
                println!("  Starting a new search.");
            }
            "stats" => match &cache {
                Some(cache) => {
                    let stats = cache.stats();
                    println!(
                        "  Cache: {} entries, {} hits, {} misses ({:.0}% hit rate)",
                        stats.size,
                        stats.hits,
                        stats.misses,
                        stats.hit_rate * 100.0
                    );
                }
                None => println!("  Cache disabled."),
            },
            question => {
                eprint!("  ...");
                let result = pipeline.run(cache.as_mut(), question, &mut context).await;
                eprint!("\r     \r");
                match result {
                    Ok(outcome) => {
                        println!();
                        print!("{}", render(&outcome));
                    }
                    Err(e) => eprintln!("  [Error] {}", lookup_failure(&e)),
                }
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Open the directory named by `store.backend`.
pub(crate) fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, LookupError> {
    let path = config.data_path();
    debug!(backend = %config.store.backend, path = %path.display(), "Opening employee directory");
    match config.store.backend.as_str() {
        "memory" => {
            if !path.exists() {
                return Ok(Arc::new(InMemoryStore::new()));
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                LookupError::Unavailable(format!("cannot read {}: {e}", path.display()))
            })?;
            let document: DirectoryDocument = serde_json::from_str(&content).map_err(|e| {
                LookupError::Unavailable(format!("{} is not a directory document: {e}", path.display()))
            })?;
            Ok(Arc::new(InMemoryStore::from_document(document)))
        }
        _ => Ok(Arc::new(FileStore::open(path)?)),
    }
}

pub(crate) fn lookup_failure(error: &LookupError) -> String {
    format!("The employee directory could not be searched right now: {error}")
}

/// Human-readable answer for one pipeline outcome.
pub(crate) fn render(outcome: &PipelineOutcome) -> String {
    let mut out = String::new();

    match &outcome.result {
        MatchResult::Broadened { notice } => {
            out.push_str(&format!("  {}\n", notice.message()));
            for sample in &notice.samples {
                out.push_str(&format!("    • {} ({})\n", sample.name, sample.location));
            }
        }
        MatchResult::Employees { employees } if employees.is_empty() => {
            out.push_str("  No matching employees found.\n");
        }
        MatchResult::Employees { employees } => {
            out.push_str(&format!("  {}\n", outcome.summary()));
            for matched in employees {
                let e = &matched.employee;
                out.push_str(&format!(
                    "    • {} ({}) — {}, {}\n",
                    e.name, e.employee_number, e.rank, e.location
                ));
                if !e.skills.is_empty() {
                    let skills: Vec<&str> = e.skills.iter().map(String::as_str).collect();
                    out.push_str(&format!("        skills: {}\n", skills.join(", ")));
                }
                for week in &matched.availability {
                    out.push_str(&format!(
                        "        week {}: {} ({}h)\n",
                        week.week_number, week.status, week.hours
                    ));
                }
            }
        }
    }

    if outcome.source == TranslationSource::KeywordFallback {
        out.push_str("  (question read with keyword rules)\n");
    }
    for note in &outcome.notes {
        out.push_str(&format!("  note: {note}\n"));
    }
    out
}
