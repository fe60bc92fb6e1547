// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idle-conversation auto-close.
//!
//! Every inbound message re-arms a deferred close for its conversation.
//! Arming cancels any timer already installed for that conversation id,
//! so only the newest one survives (debounce). The task re-checks
//! cancellation immediately before writing; a race it loses is fine
//! because close is idempotent toward status=closed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use charla_core::OutboundSender;
use charla_storage::queries::conversations;
use charla_storage::Database;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Auto-close behavior for one deployment.
#[derive(Debug, Clone)]
pub struct AutoCloseSettings {
    /// Idle time before a conversation is closed.
    pub idle: Duration,
    /// Template name for the farewell notice.
    pub farewell_template: String,
    /// Language variants tried in order for the farewell template.
    pub template_languages: Vec<String>,
}

/// One installed timer. The generation distinguishes this arm from any
/// later one for the same conversation id.
struct TimerSlot {
    generation: u64,
    token: CancellationToken,
}

/// Per-conversation deferred close timers.
pub struct AutoCloseScheduler {
    settings: AutoCloseSettings,
    timers: Arc<DashMap<String, TimerSlot>>,
    next_generation: AtomicU64,
}

impl AutoCloseScheduler {
    pub fn new(settings: AutoCloseSettings) -> Self {
        Self {
            settings,
            timers: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Arm (or re-arm) the deferred close for a conversation. Replaces
    /// any existing timer atomically: cancel-then-install.
    pub fn arm(
        &self,
        db: Database,
        conversation_id: &str,
        to: &str,
        sender: Arc<dyn OutboundSender>,
    ) {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.timers.insert(
            conversation_id.to_string(),
            TimerSlot {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let settings = self.settings.clone();
        let timers = Arc::clone(&self.timers);
        let conversation_id = conversation_id.to_string();
        let to = to.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(settings.idle) => {}
            }
            // Last chance for a manual close or a newer arm to win.
            if token.is_cancelled() {
                return;
            }
            match conversations::close(&db, &conversation_id, Some("autoclose")).await {
                Ok(true) => {
                    debug!(conversation_id, "conversation auto-closed after idle window");
                    // Farewell is best-effort: the close stands either way.
                    if let Err(e) = sender
                        .send_template(
                            &to,
                            &settings.farewell_template,
                            &settings.template_languages,
                            &[],
                        )
                        .await
                    {
                        warn!(conversation_id, error = %e, "farewell template failed");
                    }
                }
                Ok(false) => debug!(conversation_id, "already closed before timer fired"),
                Err(e) => warn!(conversation_id, error = %e, "auto-close failed"),
            }
            // A fired timer releases its slot. The generation check
            // keeps a concurrently re-armed slot intact.
            timers.remove_if(&conversation_id, |_, slot| slot.generation == generation);
        });
    }

    /// Cancel the pending timer, if any. Used by manual close paths.
    pub fn cancel(&self, conversation_id: &str) {
        if let Some((_, slot)) = self.timers.remove(conversation_id) {
            slot.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charla_core::ConversationStatus;
    use charla_storage::queries::contacts;
    use charla_test_utils::{RecordingSender, SentMessage};
    use tempfile::tempdir;

    fn settings(idle: Duration) -> AutoCloseSettings {
        AutoCloseSettings {
            idle,
            farewell_template: "conversation_closed".into(),
            template_languages: vec!["es".into(), "en_US".into()],
        }
    }

    async fn seed_conversation(db: &Database) -> String {
        let contact = contacts::upsert_inbound(db, "t1", "5215550001111", None)
            .await
            .unwrap();
        conversations::ensure_open_for_incoming(db, "t1", &contact.id)
            .await
            .unwrap()
            .id
    }

    #[tokio::test(start_paused = true)]
    async fn idle_conversation_is_closed_with_farewell() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let conv_id = seed_conversation(&db).await;
        let sender = Arc::new(RecordingSender::new());

        let scheduler = AutoCloseScheduler::new(settings(Duration::from_secs(60)));
        scheduler.arm(db.clone(), &conv_id, "5215550001111", sender.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Closed);
        assert_eq!(conv.closed_by.as_deref(), Some("autoclose"));
        assert!(matches!(sender.sent()[0], SentMessage::Template { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn fired_timer_releases_its_slot() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let conv_id = seed_conversation(&db).await;
        let sender = Arc::new(RecordingSender::new());

        let scheduler = AutoCloseScheduler::new(settings(Duration::from_secs(60)));
        scheduler.arm(db.clone(), &conv_id, "5215550001111", sender.clone());
        assert_eq!(scheduler.timers.len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Closed);

        // The map must not keep one slot per conversation forever.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(scheduler.timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_debounces_the_timer() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let conv_id = seed_conversation(&db).await;
        let sender = Arc::new(RecordingSender::new());

        let scheduler = AutoCloseScheduler::new(settings(Duration::from_secs(60)));
        scheduler.arm(db.clone(), &conv_id, "5215550001111", sender.clone());
        tokio::time::sleep(Duration::from_secs(40)).await;

        // New activity: the first timer must not fire at t=60.
        scheduler.arm(db.clone(), &conv_id, "5215550001111", sender.clone());
        tokio::time::sleep(Duration::from_secs(40)).await;
        tokio::task::yield_now().await;
        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Open);
        // The replaced timer left exactly the live slot behind.
        assert_eq!(scheduler.timers.len(), 1);

        tokio::time::sleep(Duration::from_secs(21)).await;
        tokio::task::yield_now().await;
        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.status, ConversationStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_close_wins_and_timer_stays_quiet() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let conv_id = seed_conversation(&db).await;
        let sender = Arc::new(RecordingSender::new());

        let scheduler = AutoCloseScheduler::new(settings(Duration::from_secs(60)));
        scheduler.arm(db.clone(), &conv_id, "5215550001111", sender.clone());

        conversations::close(&db, &conv_id, Some("agent-7")).await.unwrap();
        scheduler.cancel(&conv_id);
        assert!(scheduler.timers.is_empty());

        tokio::time::sleep(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        let conv = conversations::get(&db, &conv_id).await.unwrap().unwrap();
        assert_eq!(conv.closed_by.as_deref(), Some("agent-7"));
        assert!(sender.sent().is_empty());
    }
}
