use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{finish_stream, print_chunk, upload_paths};
use crate::commands;
use crate::llm::AnswerService;
use crate::state::models::ConversationLog;
use crate::state::Store;

const HELP: &str = "\
/upload <path>...  extract the given files and replace the document text
/corpus            show the current document text
/history           show every question and answer so far
/help              show this help
/quit              leave the session
anything else      ask a question about the documents";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Upload(Vec<PathBuf>),
    Corpus,
    History,
    Help,
    Quit,
    Question(String),
    Unknown(String),
}

fn parse_line(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Question(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let mut words = command.split_whitespace();
    match words.next().unwrap_or("") {
        "upload" => Input::Upload(words.map(PathBuf::from).collect()),
        "corpus" => Input::Corpus,
        "history" => Input::History,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

fn render_history(log: &ConversationLog) -> String {
    if log.is_empty() {
        return "(no questions yet)".to_string();
    }
    log.entries()
        .iter()
        .map(|entry| format!("Q: {}\nA: {}", entry.question, entry.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Read actions from stdin until EOF or `/quit`.
pub(super) async fn repl(store: &Store, service: &dyn AnswerService, stream: bool) -> Result<()> {
    println!("{HELP}");
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Input::Quit => break,
            Input::Help => println!("{HELP}"),
            Input::Corpus => println!("{}", store.read(|s| s.corpus.clone())),
            Input::History => println!("{}", store.read(|s| render_history(&s.history))),
            Input::Unknown(command) => eprintln!("unknown command: /{command} (try /help)"),
            Input::Upload(paths) => match upload_paths(store, &paths).await {
                Ok(corpus) => println!("Extracted {} characters.", corpus.chars().count()),
                Err(e) => eprintln!("{e}"),
            },
            Input::Question(question) => {
                let result = if stream {
                    let result =
                        commands::chat::ask_streaming(store, service, &question, &print_chunk)
                            .await;
                    if let Ok(outcome) = &result {
                        finish_stream(outcome);
                    }
                    result
                } else {
                    commands::chat::ask(store, service, &question)
                        .await
                        .map(|outcome| {
                            println!("{}", outcome.display_text());
                            outcome
                        })
                };
                if let Err(e) = result {
                    eprintln!("{e}");
                }
            }
        }
        prompt();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            parse_line("/upload a.pdf  b.docx"),
            Input::Upload(vec![PathBuf::from("a.pdf"), PathBuf::from("b.docx")])
        );
        assert_eq!(parse_line("  /history "), Input::History);
        assert_eq!(parse_line("/exit"), Input::Quit);
        assert_eq!(parse_line("/nope"), Input::Unknown("nope".into()));
    }

    #[test]
    fn test_other_lines_are_questions() {
        assert_eq!(
            parse_line("What is on page 2?"),
            Input::Question("What is on page 2?".into())
        );
        assert_eq!(parse_line("   "), Input::Question("   ".into()));
    }

    #[test]
    fn test_render_history() {
        let mut log = ConversationLog::default();
        assert_eq!(render_history(&log), "(no questions yet)");
        log.append("q1", "a1");
        log.append("q2", "a2");
        assert_eq!(render_history(&log), "Q: q1\nA: a1\n\nQ: q2\nA: a2");
    }
}
