//! Terminal confirmation and notification surfaces

use async_trait::async_trait;
use livedesk_core::service::{Confirmer, Notifier, Prompt};
use livedesk_core::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Asks on stdin; `--yes` answers every prompt
pub struct TerminalConfirmer {
    assume_yes: bool,
}

impl TerminalConfirmer {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &Prompt) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{}\n{} [{}/N] ", prompt.title, prompt.message, prompt.confirm_label);
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(_) => is_affirmative(&line, prompt.confirm_label),
            Err(e) => {
                warn!(error = %e, "Failed to read confirmation");
                false
            }
        }
    }
}

fn is_affirmative(answer: &str, confirm_label: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y")
        || answer.eq_ignore_ascii_case("yes")
        || answer.eq_ignore_ascii_case(confirm_label)
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!("{message}");
    }

    fn error(&self, message: &str, error: &Error) {
        warn!(error = %error, "{message}");
    }
}
