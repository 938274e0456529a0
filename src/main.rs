use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use secrag::{
    build_store_from_documents, load_documents, ChatMessage, ChatModel, Chunker, OpenAiClient,
    PromptStyle, QueryEngine, RagResponse, SearchResult, State, StorePaths,
};

const EXAMPLE_QUESTIONS: [&str; 5] = [
    "Was ist Multi-Factor Authentication?",
    "Wie erkenne ich eine Phishing-Email?",
    "Was mache ich bei einem Security-Vorfall?",
    "Wie erstelle ich ein sicheres Passwort?",
    "Was ist ein VPN und wozu brauche ich es?",
];

const PREVIEW_CHARS: usize = 100;

const RULE: &str = "----------------------------------------------------------------------";

#[derive(Parser)]
#[command(name = "secrag")]
#[command(version = "0.1")]
#[command(about = "Question answering over a cybersecurity knowledge base", long_about = None)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index and metadata from the documents directory
    Build {
        #[arg(long)]
        docs: Option<PathBuf>,
        /// Replace existing files without keeping a .bak copy
        #[arg(long)]
        no_backup: bool,
    },
    /// Answer a question from the knowledge base
    Query {
        #[arg(required = true)]
        question: Vec<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        style: Option<PromptStyle>,
    },
    /// Retrieve matching chunks without generating an answer (JSON output)
    Search {
        #[arg(required = true)]
        question: Vec<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Interactive question loop
    Chat {
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        style: Option<PromptStyle>,
    },
    /// Answer one question with every prompt style
    Compare {
        #[arg(required = true)]
        question: Vec<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Send a tiny chat request to verify the API key and connectivity
    Check,
    /// Print the effective configuration
    Config,
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !verbose {
        builder.filter_module("rustls", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn build_command(state: &State, docs: Option<PathBuf>, no_backup: bool) -> Result<()> {
    let docs_dir = docs.unwrap_or_else(|| state.docs_dir.clone());
    let chunker = Chunker::new(state.chunk_size, state.chunk_overlap)?;
    // Missing documents are reported before a missing API key.
    let documents = load_documents(&docs_dir)
        .with_context(|| format!("Failed to build vector store from '{}'", docs_dir.display()))?;
    let client = OpenAiClient::from_state(state)?;

    let paths = StorePaths::from_state(state);
    if paths.exist() {
        log::warn!("Existing vector store found; it will be rebuilt");
    }

    let store = build_store_from_documents(&documents, &chunker, &client, state.embed_concurrency)
        .with_context(|| format!("Failed to build vector store from '{}'", docs_dir.display()))?;
    store
        .save(&paths, state.backup_on_rebuild && !no_backup)
        .context("Failed to write vector store")?;

    println!(
        "Indexed {} chunks (dimension {}) into {} and {}",
        store.len(),
        store.dimension(),
        paths.index.display(),
        paths.metadata.display()
    );
    Ok(())
}

fn open_engine<'a>(
    state: &State,
    client: &'a OpenAiClient,
) -> Result<QueryEngine<'a, OpenAiClient, OpenAiClient>> {
    let paths = StorePaths::from_state(state);
    let engine = QueryEngine::open(&paths, client, client, state.max_tokens)?;
    log::info!("Knowledge base loaded: {} chunks", engine.store().len());
    Ok(engine)
}

/// Runs before the client is built so a missing index is reported even
/// without an API key.
fn ensure_store(state: &State) -> Result<()> {
    let paths = StorePaths::from_state(state);
    if !paths.exist() {
        let missing = if paths.index.is_file() { &paths.metadata } else { &paths.index };
        return Err(secrag::RagError::MissingIndex(missing.clone()).into());
    }
    Ok(())
}

fn print_sources(sources: &[SearchResult]) {
    println!("\nSources:");
    for (i, source) in sources.iter().enumerate() {
        println!("  {}. {} (Distance: {:.4})", i + 1, source.filename, source.distance);
        println!("     Preview: {}...", source.preview(PREVIEW_CHARS));
    }
}

fn print_response(response: &RagResponse) {
    print_sources(&response.sources);
    println!("\n{}", RULE);
    println!("{}", response.answer.text);
    println!("{}", RULE);
    println!("Tokens used: {}", response.answer.total_tokens);
}

fn query_command(
    state: &State,
    question: &str,
    top_k: Option<usize>,
    style: Option<PromptStyle>,
) -> Result<()> {
    ensure_store(state)?;
    let client = OpenAiClient::from_state(state)?;
    let engine = open_engine(state, &client)?;

    println!("Query: {}", question);
    let response = engine.answer(
        question,
        top_k.unwrap_or(state.top_k),
        style.unwrap_or(state.prompt_style),
    )?;
    print_response(&response);
    Ok(())
}

fn search_command(state: &State, question: &str, top_k: Option<usize>) -> Result<()> {
    ensure_store(state)?;
    let client = OpenAiClient::from_state(state)?;
    let engine = open_engine(state, &client)?;
    let top_k = top_k.unwrap_or(state.top_k);

    let results = engine.retrieve(question, top_k)?;
    let output = serde_json::json!({
        "query": question,
        "database_record_count": engine.store().len(),
        "results": results,
        "actual_results_count": results.len(),
        "requested_results_count": top_k,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn print_help() {
    println!("\nCommands:");
    println!("  help      show this help");
    println!("  examples  show example questions");
    println!("  clear     clear the screen");
    println!("  exit      quit (also: quit, q)");
    println!("\nOr just type a question.");
}

fn print_examples() {
    println!("\nExample questions:");
    for (i, example) in EXAMPLE_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, example);
    }
}

fn chat_command(state: &State, top_k: Option<usize>, style: Option<PromptStyle>) -> Result<()> {
    ensure_store(state)?;
    let client = OpenAiClient::from_state(state)?;
    let engine = open_engine(state, &client)?;
    let top_k = top_k.unwrap_or(state.top_k);
    let style = style.unwrap_or(state.prompt_style);

    println!("Cybersecurity knowledge base ({} chunks)", engine.store().len());
    print_help();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut asked = 0usize;
    loop {
        print!("\nQuestion> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let input = line?;
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" | "q" => break,
            "help" => print_help(),
            "examples" => print_examples(),
            "clear" => print!("\x1B[2J\x1B[1;1H"),
            _ => {
                asked += 1;
                match engine.answer(input, top_k, style) {
                    Ok(response) => print_response(&response),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
    }

    if asked > 0 {
        println!("\nYou asked {} question(s).", asked);
    }
    Ok(())
}

fn compare_command(state: &State, question: &str, top_k: Option<usize>) -> Result<()> {
    ensure_store(state)?;
    let client = OpenAiClient::from_state(state)?;
    let engine = open_engine(state, &client)?;

    println!("Query: {}", question);
    let sources = engine.retrieve(question, top_k.unwrap_or(state.top_k))?;
    print_sources(&sources);

    let mut summary = Vec::new();
    for style in PromptStyle::ALL {
        println!("\n{}\n{}\n{}", RULE, style, RULE);
        let answer = engine.generate(question, &sources, style)?;
        println!("({} tokens)\n{}", answer.total_tokens, answer.text);
        summary.push((style, answer));
    }

    println!("\nSummary:");
    for (style, answer) in &summary {
        println!(
            "  {:<16} tokens={:<6} length={} chars",
            style.name(),
            answer.total_tokens,
            answer.text.chars().count()
        );
    }
    Ok(())
}

fn check_command(state: &State) -> Result<()> {
    let client = OpenAiClient::from_state(state)?;
    let answer = client
        .complete(&[ChatMessage::user("Say 'API works!' in one sentence.")], 20)
        .context("API check failed")?;
    println!("API response: {}", answer.text);
    println!("Tokens used: {}", answer.total_tokens);
    Ok(())
}

fn config_command(state: &State) -> Result<()> {
    state.print_config();
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);
    let state = State::new()?;

    match args.command {
        Commands::Build { docs, no_backup } => build_command(&state, docs, no_backup)?,
        Commands::Query { question, top_k, style } => {
            query_command(&state, &question.join(" "), top_k, style)?
        }
        Commands::Search { question, top_k } => {
            search_command(&state, &question.join(" "), top_k)?
        }
        Commands::Chat { top_k, style } => chat_command(&state, top_k, style)?,
        Commands::Compare { question, top_k } => {
            compare_command(&state, &question.join(" "), top_k)?
        }
        Commands::Check => check_command(&state)?,
        Commands::Config => config_command(&state)?,
    }
    Ok(())
}
