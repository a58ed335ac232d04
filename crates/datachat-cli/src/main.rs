use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use colored::Colorize;
use datachat_client::{ChatBackend, ChatController, ClientConfig, HttpBackend, SendOutcome};
use datachat_core::Model;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

mod logging;
mod terminal_view;

use logging::init_logging;
use terminal_view::{print_reports, print_status, TerminalView};

#[derive(Parser)]
#[command(name = "datachat")]
#[command(about = "Ask an AI backend questions about a previewed data file")]
#[command(version)]
struct Cli {
    /// Dashboard server URL
    #[arg(long)]
    server_url: Option<String>,

    /// Model to route questions to (deepseek or ollama)
    #[arg(long)]
    model: Option<Model>,

    /// Task the data file belongs to
    #[arg(long)]
    task_id: Option<String>,

    /// Data file to ask about
    #[arg(long)]
    file_name: Option<String>,

    /// Save the conversation as HTML on exit
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive chat
    Chat,
    /// Ask a single question
    Ask {
        /// Question about the data
        message: String,
    },
    /// List stored reports and their data files
    Reports,
    /// Show AI backend status
    Status,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::load();
        if let Some(server_url) = &self.server_url {
            config.server_url = server_url.clone();
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(task_id) = &self.task_id {
            config.task_id = Some(task_id.clone());
        }
        if let Some(file_name) = &self.file_name {
            config.file_name = Some(file_name.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = cli.config();
    log::debug!("Server URL: {}", config.server_url);

    let backend = HttpBackend::new(&config)?;

    match cli.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => run_interactive_chat(backend, &config, cli.transcript.as_ref()).await,
        Commands::Ask { message } => {
            ask_once(backend, &config, message, cli.transcript.as_ref()).await
        }
        Commands::Reports => {
            let reports = backend.list_reports().await?;
            print_reports(&reports);
            Ok(())
        }
        Commands::Status => {
            let status = backend.backend_status().await?;
            print_status(&status);
            Ok(())
        }
    }
}

fn controller<B: ChatBackend>(
    backend: B,
    config: &ClientConfig,
    echo_user: bool,
) -> anyhow::Result<ChatController<B, TerminalView>> {
    ChatController::from_config(backend, TerminalView::new(echo_user), config)
        .map_err(|(err, _)| anyhow!(err))
}

/// Submit one question; Ctrl-C tears the pipeline down.
async fn submit<B: ChatBackend>(
    chat: &mut ChatController<B, TerminalView>,
    message: &str,
) -> SendOutcome {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = chat.submit(message, &cancel).await;
    watcher.abort();

    if outcome == SendOutcome::Cancelled {
        println!("{}", "⏹  Stopped".yellow());
    }
    outcome
}

/// Flip a thinking block of the latest answer; the transcript keeps the new render.
fn toggle_thinking<B: ChatBackend>(chat: &mut ChatController<B, TerminalView>, index: &str) {
    let Ok(index) = index.parse::<usize>() else {
        println!("{}", "Usage: /toggle <block number>".red());
        return;
    };
    let Some(message_id) = chat.last_answer_id().map(str::to_string) else {
        println!("{}", "No answer to toggle yet".yellow());
        return;
    };
    if chat.toggle_thinking(&message_id, index) {
        println!("{}", format!("Toggled thinking block {} of {}", index, message_id).dimmed());
    }
}

fn save_transcript<B: ChatBackend>(
    chat: &ChatController<B, TerminalView>,
    transcript: Option<&PathBuf>,
) -> anyhow::Result<()> {
    if let Some(path) = transcript {
        chat.view().write_transcript(path)?;
        println!("{}", format!("💾 Transcript saved to {}", path.display()).dimmed());
    }
    Ok(())
}

async fn ask_once<B: ChatBackend>(
    backend: B,
    config: &ClientConfig,
    message: &str,
    transcript: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let mut chat = controller(backend, config, true)?;
    let outcome = submit(&mut chat, message).await;
    save_transcript(&chat, transcript)?;

    match outcome {
        SendOutcome::Failed(err) => Err(anyhow!(err)),
        SendOutcome::Ignored => Err(anyhow!("empty question")),
        SendOutcome::Completed { .. } | SendOutcome::Cancelled => Ok(()),
    }
}

async fn run_interactive_chat<B: ChatBackend>(
    backend: B,
    config: &ClientConfig,
    transcript: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let mut chat = controller(backend, config, false)?;

    println!("{}", "🤖 Data chat".bold().cyan());
    println!(
        "{}",
        "Type 'exit' or 'quit' to leave, '/model <name>' to switch models, '/toggle <n>' to fold a thinking block, Ctrl-C to stop an answer"
            .dimmed()
    );
    println!();
    chat.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        chat.view().prompt();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            _ => {}
        }

        if let Some(name) = input.strip_prefix("/model") {
            match name.parse::<Model>() {
                Ok(model) => {
                    chat.set_model(model);
                    println!("{}", format!("Switched to {}", model).green());
                }
                Err(err) => println!("{}", err.red()),
            }
            continue;
        }

        if let Some(index) = input.strip_prefix("/toggle") {
            toggle_thinking(&mut chat, index.trim());
            continue;
        }

        submit(&mut chat, input).await;
    }

    save_transcript(&chat, transcript)?;
    println!("{}", "👋 Goodbye!".cyan());
    Ok(())
}
