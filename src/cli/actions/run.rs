use super::Action;
use crate::{
    app::{self, App},
    config::Config,
    metrics::{self, PANICS_RECOVERED},
    shell::Shell,
};
use anyhow::{Context, Result, bail};
use futures::FutureExt;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};
use tokio::task;
use tracing::{error, info};

const PROMPT: &str = "saucedb> ";

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Shell { config, execute } => session(config, execute).await,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run the shell, the store is closed on every way out
async fn session(config: Config, execute: Vec<String>) -> Result<()> {
    let metrics_server = match config.metrics_port {
        Some(port) => {
            let (listener, bind_addr) = metrics::bind(config.listen, port)
                .await
                .with_context(|| format!("Failed to bind the metrics port {port}"))?;
            Some(task::spawn(async move {
                if let Err(err) = metrics::serve(listener, bind_addr).await {
                    error!("metrics server stopped: {err}");
                }
            }))
        }
        None => None,
    };

    let app = Arc::new(App::open(config).await?);
    let shell = Shell::new(app::registry()?, Arc::clone(&app)).with_prompt(PROMPT);

    info!(
        "Using {}, type `help` to list the commands",
        app.config().database.display()
    );

    let outcome = AssertUnwindSafe(async {
        if execute.is_empty() {
            shell.run().await
        } else {
            shell.run_lines(&execute).await;
            Ok(())
        }
    })
    .catch_unwind()
    .await;

    app.shutdown().await;

    if let Some(server) = metrics_server {
        server.abort();
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => {
            PANICS_RECOVERED.inc();
            let message = panic_message(panic.as_ref());
            error!("shell panicked: {message}");
            bail!("the shell stopped unexpectedly{}", app.log_hint())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_panic_message() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(from_str.as_ref()), "boom");

        let from_string: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(from_string.as_ref()), "bang");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
