use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use datachat_client::{BackendStatus, ChatView};
use datachat_core::{escape_html, AnswerBuffer, Model, Report};

/// One message element of the conversation, kept for the HTML transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TranscriptEntry {
    class: &'static str,
    id: Option<String>,
    model: Option<Model>,
    html: String,
}

/// Prints the conversation to the terminal as it streams.
///
/// The terminal can only append, so answers are printed as the delta
/// between the previous and the current buffer text. The rendered HTML of
/// every element is kept so the conversation can be saved as a transcript.
#[derive(Debug, Default)]
pub struct TerminalView {
    echo_user: bool,
    typing: bool,
    input_enabled: bool,
    printed: HashMap<String, usize>,
    transcript: Vec<TranscriptEntry>,
}

impl TerminalView {
    /// `echo_user` prints the question back, for one-shot mode where it was
    /// not typed at a prompt.
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            input_enabled: true,
            ..Self::default()
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn prompt(&self) {
        print!("{} ", "You:".cyan().bold());
        let _ = io::stdout().flush();
    }

    fn clear_typing(&mut self) {
        if self.typing {
            print!("\r\x1b[2K");
            self.typing = false;
        }
    }

    fn badge(model: Model) -> String {
        format!("[{}]", model).green().bold().to_string()
    }

    /// Save the conversation as a standalone HTML page.
    pub fn write_transcript(&self, path: &Path) -> io::Result<()> {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Data chat</title></head>\n<body>\n<div class=\"chat-messages\">\n",
        );
        for entry in &self.transcript {
            out.push_str("<div class=\"message ");
            out.push_str(entry.class);
            out.push('"');
            if let Some(id) = &entry.id {
                out.push_str(&format!(" id=\"{}\"", escape_html(id)));
            }
            out.push('>');
            if let Some(model) = entry.model {
                out.push_str(&format!("<span class=\"model-badge\">{}</span>", model));
            }
            out.push_str(&format!("<div class=\"message-content\">{}</div></div>\n", entry.html));
        }
        out.push_str("</div>\n</body>\n</html>\n");
        std::fs::write(path, out)
    }
}

impl ChatView for TerminalView {
    fn add_user_message(&mut self, text: &str) {
        if self.echo_user {
            println!("{} {}", "You:".cyan().bold(), text);
        }
        self.transcript.push(TranscriptEntry {
            class: "user-message",
            id: None,
            model: None,
            html: escape_html(text),
        });
    }

    fn add_ai_message(&mut self, model: Model, text: &str, html: &str) {
        self.clear_typing();
        println!("{} {}", Self::badge(model), text);
        self.transcript.push(TranscriptEntry {
            class: "ai-message",
            id: None,
            model: Some(model),
            html: html.to_string(),
        });
    }

    fn show_typing_indicator(&mut self) {
        print!("{}", "⏳ Thinking...".dimmed());
        let _ = io::stdout().flush();
        self.typing = true;
    }

    fn create_answer(&mut self, message_id: &str, model: Model) {
        self.clear_typing();
        print!("{} ", Self::badge(model));
        let _ = io::stdout().flush();
        self.printed.insert(message_id.to_string(), 0);
        self.transcript.push(TranscriptEntry {
            class: "ai-message",
            id: Some(message_id.to_string()),
            model: Some(model),
            html: String::new(),
        });
    }

    fn update_answer(&mut self, buffer: &AnswerBuffer, html: &str) {
        let printed = self
            .printed
            .entry(buffer.message_id().to_string())
            .or_insert(0);
        if let Some(delta) = buffer.text().get(*printed..) {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
        *printed = buffer.text().len();

        if let Some(entry) = self
            .transcript
            .iter_mut()
            .rev()
            .find(|entry| entry.id.as_deref() == Some(buffer.message_id()))
        {
            entry.html = html.to_string();
        }
    }

    fn show_error(&mut self, message: &str) {
        self.clear_typing();
        println!("{}", format!("❌ {}", message).red());
        self.transcript.push(TranscriptEntry {
            class: "error-message",
            id: None,
            model: None,
            html: escape_html(message),
        });
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{}", format!("⚠️  {}", message).yellow().dimmed());
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if enabled && !self.input_enabled {
            if self.typing {
                // Closed before any answer text arrived.
                self.clear_typing();
            } else {
                // End the line an answer was streaming on.
                println!();
            }
        }
        self.input_enabled = enabled;
    }

    fn focus_input(&mut self) {}
}

pub fn print_reports(reports: &[Report]) {
    if reports.is_empty() {
        println!("{}", "No reports found".yellow());
        return;
    }
    for report in reports {
        println!(
            "{} {} {}",
            format!("[{}]", report.kind.label()).blue().bold(),
            report.name.bold(),
            report.timestamp.as_deref().unwrap_or_default().dimmed()
        );
        let task_id = report.temporary_task_id();
        for file in &report.files {
            println!(
                "    {}  {}",
                file.name,
                format!("--task-id {} --file-name {}", task_id, file.name).dimmed()
            );
        }
    }
}

pub fn print_status(status: &BackendStatus) {
    if status.is_online() {
        println!("{}", "✅ Ollama is online".green());
    } else {
        println!("{}", format!("❌ Ollama is {}", status.status).red());
    }
    if let Some(default_model) = &status.default_model {
        println!("   Default model: {}", default_model.bold());
    }
    for model in &status.models {
        println!("   - {}", model);
    }
    if let Some(message) = status.message.as_deref().or(status.error.as_deref()) {
        println!("   {}", message.dimmed());
    }
}
