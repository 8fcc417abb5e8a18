//! Terminal front end: chat with an Ollama model that can use the tools of a
//! remote tool server.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;
use toolrelay::core::AgentEvent;
use toolrelay::{Config, SessionBuilder, Step};
use toolrelay_ollama_model::OllamaProvider;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    debug!("using {config:?}");

    let model_provider = OllamaProvider::new(config.ollama_config());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let session = SessionBuilder::with_model_provider(model_provider)
        .with_tool_server_url(&config.tool_server_url)
        .on_event(move |event| {
            event_tx.send(event).ok();
        })
        .build()
        .await;
    let mut session = match session {
        Ok(session) => session,
        Err(err) => {
            eprintln!(
                "{} {err}",
                "❌ Failed to start, is the tool server running?".red()
            );
            return ExitCode::FAILURE;
        }
    };

    println!(
        "✅ Fetched {} tools from {}",
        session.tools().len(),
        config.tool_server_url.bright_white()
    );
    println!(
        "🤖 Agent ready with model {}. Type 'exit' to quit.",
        session.model_name().bright_white().bold()
    );

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("{}", "You: ".bright_green().bold());
        if std::io::stdout().flush().is_err() {
            break;
        }

        let Some(line) = read_line(&mut lines).await else {
            break;
        };

        let mut progress_bar = None;
        let mut turn = pin!(session.handle_input(&line));

        let result = loop {
            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);

            let sleep = sleep(Duration::from_millis(100));
            select! {
                biased;

                Some(event) = event_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    print_event(event);
                }
                result = &mut turn => break result,
                _ = sleep => {}
            }
        };

        if let Some(progress_bar) = progress_bar {
            progress_bar.finish_and_clear();
        }
        while let Ok(event) = event_rx.try_recv() {
            print_event(event);
        }

        match result {
            Ok(Step::Exit) => break,
            Ok(Step::Skip) => continue,
            Ok(Step::Reply(outcome)) => {
                println!(
                    "{}{} {}",
                    BAR_CHAR.bright_cyan(),
                    "AI:".bright_cyan().bold(),
                    outcome.reply.bright_white()
                );
            }
            Err(err) => {
                println!("{}⚠️  {err}", BAR_CHAR.bright_red());
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_event(event: AgentEvent) {
    match event {
        AgentEvent::ToolCall(call) => {
            let bar = BAR_CHAR.bright_yellow();
            println!(
                "{bar}🧠 Calling {} with {}",
                call.name.bright_white().bold(),
                Value::Object(call.arguments)
            );
        }
        AgentEvent::ToolResult(result) => {
            let bar = BAR_CHAR.bright_yellow();
            println!("{bar}🔧 {} returned {}", result.name, result.content.dimmed());
        }
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
