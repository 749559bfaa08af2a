use std::error::Error;
use std::fmt::Write as _;
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use glosswidget_rs::entry::{Entry, distinct_synonyms, parse_payload};
use glosswidget_rs::fetch::HttpFetcher;
use glosswidget_rs::search::EMPTY_QUERY_MESSAGE;
use glosswidget_rs::{
    BufferedSurface, DEFAULT_API_BASE, FileStore, Lookup, SearchOutcome, Source, Storage,
    WidgetConfig,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glosswidget-rs", about = "Look up English words", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// File holding the theme, search history and cached responses.
    #[arg(long, global = true, default_value = ".glosswidget.json")]
    store: PathBuf,

    /// Dictionary API base URL; the word is appended as a path segment.
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up a word, using the cache when possible.
    Search {
        /// Word to look up. Multiple arguments are joined with spaces.
        #[arg(required = true)]
        term: Vec<String>,
        /// Print the rendered HTML result fragment.
        #[arg(long)]
        html: bool,
    },
    /// Show recent searches, newest first.
    History,
    /// Show the stored colour theme.
    Theme {
        /// Switch between dark and light before printing.
        #[arg(long)]
        toggle: bool,
    },
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = WidgetConfig {
        api_base: cli.api_base.clone(),
        ..WidgetConfig::default()
    };
    let storage = config.storage(FileStore::new(&cli.store));
    match cli.command {
        Command::Search { term, html } => {
            handle_search(storage, &config, term.join(" "), html, cli.json).await
        }
        Command::History => handle_history(&storage, cli.json),
        Command::Theme { toggle } => handle_theme(&storage, toggle, cli.json),
    }
}

async fn handle_search(
    storage: Storage<FileStore>,
    config: &WidgetConfig,
    term: String,
    as_html: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let lookup = Lookup::new(storage, HttpFetcher::new(config.api_base.clone()));
    let surface = BufferedSurface::new();
    match lookup.search(&surface, &term).await {
        SearchOutcome::Rejected => Err(EMPTY_QUERY_MESSAGE.into()),
        SearchOutcome::Failed { message, .. } => Err(message.into()),
        SearchOutcome::Found {
            term,
            source,
            payload,
        } => {
            if as_json {
                let body = json!({
                    "term": term,
                    "source": source.to_string(),
                    "entries": payload,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if as_html {
                println!("{}", surface.result_html());
            } else {
                print_entries(&parse_payload(&payload)?, source);
            }
            Ok(())
        }
    }
}

fn handle_history(storage: &Storage<FileStore>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let terms = storage.history();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&terms)?);
    } else if terms.is_empty() {
        println!("No searches yet.");
    } else {
        for (idx, term) in terms.iter().enumerate() {
            println!("{:>2}. {}", idx + 1, term);
        }
    }
    Ok(())
}

fn handle_theme(
    storage: &Storage<FileStore>,
    toggle: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let theme = if toggle {
        storage.toggle_theme()
    } else {
        storage.theme()
    };
    if as_json {
        let body = json!({ "theme": theme.as_str(), "icon": theme.icon() });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{} {}", theme.icon(), theme);
    }
    Ok(())
}

fn print_entries(entries: &[Entry], source: Source) {
    let Some(entry) = entries.first() else {
        println!("No results.");
        return;
    };
    let body = entry_markdown(entry);
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, &body, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{body}");
    }
    if source == Source::Cache {
        println!("(from cache)");
    }
}

fn entry_markdown(entry: &Entry) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "# {}", entry.word);
    if let Some(phonetic) = entry.phonetic_label() {
        let _ = writeln!(text, "*{phonetic}*");
    }
    if let Some(audio) = entry.audio_src() {
        let _ = writeln!(text, "Audio: {audio}");
    }
    text.push('\n');
    let mut number = 0usize;
    for meaning in &entry.meanings {
        let label = meaning.part_of_speech.as_deref().unwrap_or("unknown");
        for definition in &meaning.definitions {
            number += 1;
            let _ = writeln!(text, "{number}. **{label}** {}", definition.definition);
            if let Some(example) = definition.example() {
                let _ = writeln!(text, "   *Example:* {example}");
            }
        }
    }
    let synonyms = distinct_synonyms(&entry.meanings);
    if !synonyms.is_empty() {
        let _ = writeln!(text, "\n**Synonyms:** {}", synonyms.join(", "));
    }
    text
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}
