mod chat;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands::{self, documents};
use crate::config::{Settings, DEFAULT_BASE_URL, DEFAULT_LOG_LEVEL, DEFAULT_MODEL};
use crate::doc_processor::DocumentExtractor;
use crate::llm::gemini::GeminiClient;
use crate::llm::{AskOutcome, StreamChunk};
use crate::state::Store;

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Extract text from PDF, DOCX and XLSX files and ask questions about it."
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "DOCQA_LOG", default_value = DEFAULT_LOG_LEVEL, global = true)]
    pub log_level: String,
}

impl From<SettingsArgs> for Settings {
    fn from(a: SettingsArgs) -> Self {
        Settings {
            api_key: a.api_key,
            base_url: a.base_url,
            model: a.model,
            log_level: a.log_level,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the text extracted from the given files
    Extract(FilesArgs),

    /// Ask one question about the given files
    Ask(AskArgs),

    /// Interactive session: upload files and ask questions
    Chat(ChatArgs),

    /// Show the effective settings with secrets masked
    Settings,
}

#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Document to upload (PDF, DOCX or XLSX); repeat for several
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub files: FilesArgs,

    /// The question to ask
    pub question: String,

    /// Print the answer as it is generated
    #[arg(long)]
    pub stream: bool,

    /// Print the question/answer pair as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub files: FilesArgs,

    #[arg(long)]
    pub stream: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let settings: Settings = self.settings.into();
        match self.command {
            Commands::Extract(args) => run_extract(args).await,
            Commands::Ask(args) => run_ask(&settings, args).await,
            Commands::Chat(args) => run_chat(&settings, args).await,
            Commands::Settings => {
                for (key, value) in commands::settings::get_settings(&settings) {
                    println!("{key} = {value}");
                }
                Ok(())
            }
        }
    }
}

async fn upload_paths(store: &Store, paths: &[PathBuf]) -> Result<String> {
    let files = documents::open_files(paths).await?;
    documents::select_files(store, files)?;
    Ok(documents::upload(store, &DocumentExtractor).await?)
}

async fn run_extract(args: FilesArgs) -> Result<()> {
    let store = Store::new();
    let corpus = upload_paths(&store, &args.files).await?;
    println!("{corpus}");
    Ok(())
}

async fn run_ask(settings: &Settings, args: AskArgs) -> Result<()> {
    let client = GeminiClient::new(settings.gemini()?);
    let store = Store::new();
    upload_paths(&store, &args.files.files).await?;

    let outcome = if args.stream && !args.json {
        let outcome = commands::chat::ask_streaming(&store, &client, &args.question, &print_chunk)
            .await?;
        finish_stream(&outcome);
        outcome
    } else {
        commands::chat::ask(&store, &client, &args.question).await?
    };

    if args.json {
        let entry = serde_json::json!({
            "question": args.question,
            "answer": outcome.display_text(),
            "recorded": outcome.is_recorded(),
        });
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else if !args.stream {
        println!("{}", outcome.display_text());
    }
    Ok(())
}

async fn run_chat(settings: &Settings, args: ChatArgs) -> Result<()> {
    let client = GeminiClient::new(settings.gemini()?);
    let store = Store::new();
    if !args.files.files.is_empty() {
        upload_paths(&store, &args.files.files).await?;
    }
    chat::repl(&store, &client, args.stream).await
}

/// Text still owed to the user once streaming ends. Streamed chunks only ever
/// carry a real answer, so the fallback texts are printed here.
fn stream_epilogue(outcome: &AskOutcome) -> Option<&str> {
    match outcome {
        AskOutcome::Answered(_) => None,
        other => Some(other.display_text()),
    }
}

fn finish_stream(outcome: &AskOutcome) {
    match stream_epilogue(outcome) {
        Some(text) => println!("{text}"),
        None => println!(),
    }
}

fn print_chunk(chunk: StreamChunk) {
    use std::io::Write;

    if !chunk.done {
        print!("{}", chunk.delta);
        let _ = std::io::stdout().flush();
    }
}
