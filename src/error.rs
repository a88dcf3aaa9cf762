//! User-facing errors.
//!
//! Each stage that can fail has a fixed message. The wrapped source is
//! logged in full but never shown; [`AppError::user_message`] is what the
//! user sees.

use thiserror::Error;

/// Appended to every user-facing error message.
pub const COMMON_ERROR_MESSAGE: &str =
    "If the problem persists, please contact the system administrator.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Ingestion, index build, client or logger setup.
    #[error("Initialization failed.")]
    Initialize(#[source] anyhow::Error),
    /// Replaying the stored conversation.
    #[error("Failed to display the conversation log.")]
    ConversationLog(#[source] anyhow::Error),
    /// Query rewrite, retrieval or answer generation.
    #[error("Failed to get an answer.")]
    Response(#[source] anyhow::Error),
    /// Turning a response into a payload.
    #[error("Failed to display the answer.")]
    Display(#[source] anyhow::Error),
}

impl AppError {
    /// The fixed message for this stage plus the administrator notice.
    pub fn user_message(&self) -> String {
        format!("{}\n{}", self, COMMON_ERROR_MESSAGE)
    }

    /// Underlying cause, with its context chain.
    pub fn detail(&self) -> String {
        let source = match self {
            AppError::Initialize(e)
            | AppError::ConversationLog(e)
            | AppError::Response(e)
            | AppError::Display(e) => e,
        };
        format!("{:#}", source)
    }

    /// Log the full detail under this stage's fixed message.
    pub fn logged(self) -> Self {
        tracing::error!(error = %self.detail(), "{}", self);
        self
    }

    /// Whether the session can continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Initialize(_) | AppError::ConversationLog(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_user_message_hides_detail() {
        let err = AppError::Response(anyhow!("401 Unauthorized: sk-secret"));
        let msg = err.user_message();
        assert_eq!(
            msg,
            format!("Failed to get an answer.\n{}", COMMON_ERROR_MESSAGE)
        );
        assert!(!msg.contains("sk-secret"));
    }

    #[test]
    fn test_detail_keeps_context_chain() {
        let err = AppError::Initialize(anyhow!("no such file").context("ingestion failed"));
        assert_eq!(err.detail(), "ingestion failed: no such file");
    }

    #[test]
    fn test_each_stage_has_distinct_message() {
        let msgs = [
            AppError::Initialize(anyhow!("x")).to_string(),
            AppError::ConversationLog(anyhow!("x")).to_string(),
            AppError::Response(anyhow!("x")).to_string(),
            AppError::Display(anyhow!("x")).to_string(),
        ];
        for (i, a) in msgs.iter().enumerate() {
            for b in &msgs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_fatality() {
        assert!(AppError::Initialize(anyhow!("x")).is_fatal());
        assert!(AppError::ConversationLog(anyhow!("x")).is_fatal());
        assert!(!AppError::Response(anyhow!("x")).is_fatal());
        assert!(!AppError::Display(anyhow!("x")).is_fatal());
    }
}
