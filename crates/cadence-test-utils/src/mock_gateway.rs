// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `MessagingGateway` with captured outbound
//! traffic for assertion in tests, plus injectable delivery failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cadence_core::{CadenceError, Escalation, MessagingGateway, Recipient};

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    UpdateRequest {
        user_id: String,
        project_name: String,
        project_id: String,
    },
    Text {
        recipient: Recipient,
        text: String,
    },
    Escalation(Escalation),
}

/// A messaging gateway that records everything and delivers nothing.
#[derive(Default)]
pub struct MockGateway {
    sent: Arc<Mutex<Vec<Sent>>>,
    /// Number of upcoming sends that fail before delivery succeeds again.
    fail_next: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` sends fail with a gateway error.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// All captured messages, in send order.
    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Captured escalations only.
    pub async fn escalations(&self) -> Vec<Escalation> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Escalation(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    /// Captured text messages addressed to `user_id`.
    pub async fn texts_to_user(&self, user_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Text {
                    recipient: Recipient::User(id),
                    text,
                } if id == user_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Project IDs of captured update requests, in send order.
    pub async fn prompted_projects(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::UpdateRequest { project_id, .. } => Some(project_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(&self, message: Sent) -> Result<(), CadenceError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(CadenceError::Gateway {
                message: "mock delivery failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_update_request(
        &self,
        user_id: &str,
        project_name: &str,
        project_id: &str,
    ) -> Result<(), CadenceError> {
        self.record(Sent::UpdateRequest {
            user_id: user_id.to_string(),
            project_name: project_name.to_string(),
            project_id: project_id.to_string(),
        })
        .await
    }

    async fn send_text(&self, recipient: &Recipient, text: &str) -> Result<(), CadenceError> {
        self.record(Sent::Text {
            recipient: recipient.clone(),
            text: text.to_string(),
        })
        .await
    }

    async fn send_escalation(&self, escalation: &Escalation) -> Result<(), CadenceError> {
        self.record(Sent::Escalation(escalation.clone())).await
    }
}
