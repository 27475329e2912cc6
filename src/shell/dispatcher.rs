use super::{
    coerce::{CoercionError, coerce_all},
    registry::{Args, Flow, HELP_ALIASES, Registry},
};
use crate::render::Table;
use anyhow::{Context, Result, anyhow};
use rustyline::{DefaultEditor, error::ReadlineError};
use std::{
    sync::{Arc, mpsc as std_mpsc},
    thread,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const HELP_USAGE: &str = "USAGE: help <topic>\n    Prints the documentation of a command";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown command {name:?}, run `help` to list the available commands")]
    UnknownCommand { name: String },
    #[error("{command} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        command: String,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error("no help for {topic:?}, run `help` to list the available commands")]
    UnknownHelpTopic { topic: String },
    #[error("{command} failed: {reason:#}")]
    CommandFailed {
        command: String,
        reason: anyhow::Error,
    },
}

/// Split a line into its `;` separated sub-commands
#[must_use]
pub fn split_commands(line: &str) -> Vec<&str> {
    line.split(';')
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .collect()
}

/// Whitespace tokenizer, a double-quoted span is kept as one token
#[must_use]
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut started = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if started {
        tokens.push(current);
    }

    tokens
}

/// Outcome of one read at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Prompted {
    Line(String),
    /// Ctrl-C while editing
    Interrupted,
    /// Ctrl-D or closed input
    Closed,
}

fn prompted(read: Result<String, ReadlineError>) -> Result<Prompted> {
    match read {
        Ok(line) => Ok(Prompted::Line(line)),
        Err(ReadlineError::Interrupted) => Ok(Prompted::Interrupted),
        Err(ReadlineError::Eof) => Ok(Prompted::Closed),
        Err(err) => Err(anyhow!("failed to read from the prompt: {err}")),
    }
}

/// Prompt thread body, one read per `next` signal
fn read_prompt(
    prompt: &str,
    reads: &mpsc::Sender<Result<Prompted>>,
    next: &std_mpsc::Receiver<()>,
) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            let _ = reads.blocking_send(Err(anyhow!("failed to start the line editor: {err}")));
            return;
        }
    };

    loop {
        let read = editor.readline(prompt);
        if let Some(line) = read.as_ref().ok().filter(|line| !line.trim().is_empty()) {
            let _ = editor.add_history_entry(line.as_str());
        }

        let read = prompted(read);
        let more = matches!(read, Ok(Prompted::Line(_) | Prompted::Interrupted));

        if reads.blocking_send(read).is_err() || !more || next.recv().is_err() {
            return;
        }
    }
}

/// Read-dispatch loop over a command registry
pub struct Shell<C> {
    registry: Registry<C>,
    context: Arc<C>,
    prompt: String,
}

impl<C: Send + Sync + 'static> Shell<C> {
    #[must_use]
    pub fn new(registry: Registry<C>, context: Arc<C>) -> Self {
        Self {
            registry,
            context,
            prompt: "> ".to_string(),
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        prompt.clone_into(&mut self.prompt);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// Run a single sub-command
    ///
    /// # Errors
    ///
    /// Returns the reason the sub-command did not run or failed; none of them
    /// are fatal to the loop
    pub async fn dispatch(&self, input: &str) -> Result<Flow, DispatchError> {
        let tokens = tokenize(input);
        let Some((name, raw_args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };

        if HELP_ALIASES.contains(&name.as_str()) {
            println!("{}", self.render_help(raw_args)?);
            return Ok(Flow::Continue);
        }

        let command = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::UnknownCommand { name: name.clone() })?;

        let kinds = command.param_kinds();
        if raw_args.len() != kinds.len() {
            return Err(DispatchError::ArityMismatch {
                command: name.clone(),
                expected: kinds.len(),
                got: raw_args.len(),
            });
        }

        let values = coerce_all(raw_args, kinds)?;
        let handler = command.handler();

        debug!(command = %name, args = values.len(), "dispatching");

        handler(Arc::clone(&self.context), Args::new(values))
            .await
            .map_err(|reason| DispatchError::CommandFailed {
                command: name.clone(),
                reason,
            })
    }

    /// Run every sub-command of a line, reporting failures
    pub async fn handle_line(&self, line: &str) -> Flow {
        for command in split_commands(line) {
            match self.dispatch(command).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Flow::Quit,
                Err(err @ DispatchError::CommandFailed { .. }) => error!("{err}"),
                Err(err) => warn!("{err}"),
            }
        }

        Flow::Continue
    }

    /// Run lines in order until one of them quits
    pub async fn run_lines<I, S>(&self, lines: I) -> Flow
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if self.handle_line(line.as_ref()).await == Flow::Quit {
                return Flow::Quit;
            }
        }

        Flow::Continue
    }

    /// Interactive loop on the terminal, returns when a command quits or input ends
    ///
    /// The line editor lives on its own thread and only prompts again once the
    /// previous line has been handled.
    ///
    /// # Errors
    ///
    /// Returns an error if the line editor cannot start or fails to read
    pub async fn run(&self) -> Result<()> {
        let (reads_tx, mut reads) = mpsc::channel(1);
        let (next_tx, next_rx) = std_mpsc::channel();
        let prompt = self.prompt.clone();

        thread::Builder::new()
            .name("prompt".to_string())
            .spawn(move || read_prompt(&prompt, &reads_tx, &next_rx))
            .context("failed to start the prompt thread")?;

        while let Some(read) = reads.recv().await {
            match read? {
                Prompted::Line(line) => {
                    if self.handle_line(&line).await == Flow::Quit {
                        return Ok(());
                    }
                }
                Prompted::Interrupted => info!("interrupted, type `quit` to exit"),
                Prompted::Closed => {
                    info!("end of input");
                    return Ok(());
                }
            }

            if next_tx.send(()).is_err() {
                break;
            }
        }

        Ok(())
    }

    fn render_help(&self, topic: &[String]) -> Result<String, DispatchError> {
        match topic {
            [] => {
                let mut table = Table::new(["Command", "Summary"]);
                for (aliases, summary) in self.registry.list(false) {
                    table.row([aliases.join(", "), summary.to_string()]);
                }
                Ok(format!(
                    "{table}\nRun `help <command>` to get documentation for that command"
                ))
            }
            [topic] if HELP_ALIASES.contains(&topic.as_str()) => Ok(HELP_USAGE.to_string()),
            [topic] => self
                .registry
                .help(topic)
                .ok_or_else(|| DispatchError::UnknownHelpTopic {
                    topic: topic.clone(),
                }),
            more => Err(DispatchError::ArityMismatch {
                command: "help".to_string(),
                expected: 1,
                got: more.len(),
            }),
        }
    }
}
