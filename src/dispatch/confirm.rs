//! Confirmation gate seam
//!
//! Destructive operations are gated by a yes/no decision. The gate is a
//! trait so any surface can supply it: a CLI prompt, a GUI modal, or the
//! headless auto-confirm used in tests.

use async_trait::async_trait;

/// Supplies the yes/no decision for a gated operation. The call suspends
/// until the user (or the test harness) decides.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Headless gate with a fixed answer
pub struct AutoConfirm(pub bool);

#[async_trait]
impl ConfirmationGate for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_confirm() {
        assert!(AutoConfirm(true).confirm("sure?").await);
        assert!(!AutoConfirm(false).confirm("sure?").await);
    }
}
