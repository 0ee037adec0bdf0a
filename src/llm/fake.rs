//! Chat backend double that replies with canned text.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::ChatBackend;
use crate::error::GatewayResult;
use crate::model::chat::ChatTurn;

/// Replies with a canned text and records every conversation it was sent.
pub struct CannedBackend {
    pub reply: String,
    pub seen: Arc<Mutex<Vec<Vec<ChatTurn>>>>,
}

impl CannedBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ChatBackend for CannedBackend {
    async fn complete(&self, turns: &[ChatTurn]) -> GatewayResult<String> {
        self.seen.lock().unwrap().push(turns.to_vec());
        Ok(self.reply.clone())
    }
}
