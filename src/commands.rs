//! CLI command implementations.
//!
//! Answers go to stdout; tags, status, and logs go to stderr so that
//! `docchat ask ... > answer.txt` captures only the answer text.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use docchat_core::fallback::{analyze_document, extract_key_terms};
use docchat_core::models::{AnswerKind, Role};

use crate::chat::{ChatReply, ChatService, ReplySource};
use crate::config::Config;
use crate::documents::{chat_context, read_document, read_documents};
use crate::registry::ModelRegistry;

const CLI_CONVERSATION: &str = "cli";

/// Answer one question and exit.
pub async fn run_ask(config: &Config, query: &str, docs: &[PathBuf], project: bool) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be empty");
    }
    let context = chat_context(read_documents(docs)?, project);
    let service = ChatService::from_config(config);

    let reply = service.send(CLI_CONVERSATION, query, &context).await;
    println!("{}", reply.message.content);
    print_tag(&reply);
    Ok(())
}

/// Interactive conversation over stdin.
pub async fn run_chat(config: &Config, docs: &[PathBuf], project: bool) -> Result<()> {
    let context = chat_context(read_documents(docs)?, project);
    let service = ChatService::from_config(config);
    service.prepare(&context).await;

    eprintln!("Ask about your documents. /history shows the conversation, /quit exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                for msg in service.history(CLI_CONVERSATION) {
                    let who = match msg.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("[{}] {}: {}", msg.timestamp.format("%H:%M:%S"), who, msg.content);
                }
            }
            query => {
                let reply = service.send(CLI_CONVERSATION, query, &context).await;
                println!("{}", reply.message.content);
                print_tag(&reply);
            }
        }
    }

    Ok(())
}

/// Print the offline analysis and key terms of a document.
pub fn run_analyze(doc: &Path, terms: usize) -> Result<()> {
    let document = read_document(doc)?;
    let Some(text) = document.content else {
        anyhow::bail!("{} has no text content", document.name);
    };

    println!("{}", analyze_document(&text));
    let key_terms = extract_key_terms(&text, terms);
    if !key_terms.is_empty() {
        println!();
        println!("Key terms: {}", key_terms.join(", "));
    }
    Ok(())
}

/// Show configured providers and model state.
pub async fn run_status(config: &Config, load: bool) -> Result<()> {
    let registry = ModelRegistry::from_config(config);

    println!(
        "embedding:  provider={} model={}",
        config.embedding.provider,
        config.embedding.model.as_deref().unwrap_or("-")
    );
    println!(
        "generation: provider={} model={}",
        config.generation.provider,
        config.generation.model.as_deref().unwrap_or("-")
    );

    if load {
        let (embedding, generation) = registry.warm_up().await;
        if let Err(e) = embedding {
            eprintln!("embedding model unavailable: {}", e);
        }
        if let Err(e) = generation {
            eprintln!("generation model unavailable: {}", e);
        }
    }

    println!("embedding state:  {:?}", registry.embedding_state());
    println!("generation state: {:?}", registry.generation_state());
    match registry.status_message() {
        Some(message) => println!("{}", message),
        None if !load => println!("Models load on first question."),
        None => println!("Model path unavailable; answers use the offline fallback."),
    }
    Ok(())
}

fn print_tag(reply: &ChatReply) {
    match reply.source {
        ReplySource::Answer(AnswerKind::Grounded) => {}
        ReplySource::Answer(AnswerKind::Fallback) => eprintln!("[fallback]"),
        ReplySource::Answer(AnswerKind::NoRelevantContext) => eprintln!("[no context]"),
        ReplySource::MissingDocuments => eprintln!("[no documents]"),
        ReplySource::Error => eprintln!("[error]"),
    }
}
