//! Durable queue transport.
//!
//! The worker only needs two operations: receive one message and delete a
//! message by its handle. Redelivery of un-deleted messages (visibility
//! timeout, dead-lettering) is the transport's business.

pub mod sqs;

pub use sqs::SqsQueue;

use async_trait::async_trait;
use std::fmt;

use crate::error::TransportError;

/// Opaque token identifying one in-flight delivery of a message.
///
/// Required to acknowledge that delivery; never reused across jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log records; SQS handles run to hundreds of chars.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(16)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One received message.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub handle: ReceiptHandle,
    pub body: Vec<u8>,
}

/// Queue client used by the poll loop and the orchestrator.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receive at most one message. `Ok(None)` means the queue was empty.
    async fn receive(&self) -> Result<Option<QueueMessage>, TransportError>;

    /// Delete (acknowledge) a received message.
    async fn delete(&self, handle: &ReceiptHandle) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_handle() {
        let handle = ReceiptHandle::new("AQEBwJnKyrHigUMZj6rYigCgxlaS3SLy0a");
        assert_eq!(handle.short(), "AQEBwJnKyrHigUMZ");

        let handle = ReceiptHandle::new("abc");
        assert_eq!(handle.short(), "abc");
    }
}
