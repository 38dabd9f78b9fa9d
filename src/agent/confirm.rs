use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Yes/no supplier for the confirmation gate. The gate blocks on this
/// until an answer arrives (or the configured timeout elapses).
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything. Used when confirm_actions is off and in automation
/// contexts that supply an implicit yes.
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Asks on the terminal. Anything other than y/yes declines.
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        if stdout
            .write_all(format!("Execute '{prompt}'? [y/N]: ").as_bytes())
            .await
            .is_err()
            || stdout.flush().await.is_err()
        {
            return false;
        }

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if reader.read_line(&mut line).await.is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed-answer confirmer for gate tests.
    pub(crate) struct FixedConfirmer(pub bool);

    #[async_trait]
    impl Confirmer for FixedConfirmer {
        async fn confirm(&self, _prompt: &str) -> bool {
            self.0
        }
    }

    /// Never answers; exercises the confirmation timeout.
    pub(crate) struct SilentConfirmer;

    #[async_trait]
    impl Confirmer for SilentConfirmer {
        async fn confirm(&self, _prompt: &str) -> bool {
            std::future::pending::<bool>().await
        }
    }

    #[tokio::test]
    async fn auto_approve_always_says_yes() {
        assert!(AutoApprove.confirm("anything").await);
    }
}
