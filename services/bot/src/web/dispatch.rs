//! services/bot/src/web/dispatch.rs
//!
//! Routes Telegram updates to the conversation engine. Each user gets a
//! dedicated worker task fed by a channel, so a user's events run one at a
//! time and in arrival order while different users proceed concurrently.
//! A worker that sits idle for `WORKER_IDLE_TIMEOUT` exits and gives up its
//! queue entry; the next event for that user starts a fresh one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use campaign_bot_core::domain::{InboundEvent, UserId};
use campaign_bot_core::ConversationEngine;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::adapters::TelegramAdapter;
use crate::web::protocol::Update;

pub const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

type QueueMap = HashMap<UserId, mpsc::UnboundedSender<InboundEvent>>;
type Queues = Arc<Mutex<QueueMap>>;

pub struct Dispatcher {
    engine: Arc<ConversationEngine>,
    telegram: Arc<TelegramAdapter>,
    queues: Queues,
    idle_timeout: Duration,
}

impl Dispatcher {
    pub fn new(engine: Arc<ConversationEngine>, telegram: Arc<TelegramAdapter>) -> Self {
        Self::with_idle_timeout(engine, telegram, WORKER_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        engine: Arc<ConversationEngine>,
        telegram: Arc<TelegramAdapter>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            telegram,
            queues: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Acknowledges button presses and queues the update for its user.
    pub async fn dispatch(&self, update: Update) {
        if let Some(query) = &update.callback_query {
            if let Err(e) = self.telegram.answer_callback_query(&query.id).await {
                warn!("Failed to answer callback query {}: {}", query.id, e);
            }
        }

        match update.to_event() {
            Some(event) => self.enqueue(event),
            None => debug!("Ignoring update {} with nothing to act on.", update.update_id),
        }
    }

    pub fn enqueue(&self, event: InboundEvent) {
        let user = event.user;
        let mut queues = lock(&self.queues);
        let sender = queues
            .entry(user)
            .or_insert_with(|| self.spawn_worker(user));

        if let Err(mpsc::error::SendError(event)) = sender.send(event) {
            warn!("Worker for user {} is gone; starting a new one.", user);
            let sender = self.spawn_worker(user);
            if sender.send(event).is_err() {
                error!("Dropped an event for user {}.", user);
            }
            queues.insert(user, sender);
        }
    }

    /// Number of users that currently have a live worker.
    pub fn active_workers(&self) -> usize {
        lock(&self.queues).len()
    }

    fn spawn_worker(&self, user: UserId) -> mpsc::UnboundedSender<InboundEvent> {
        let (sender, receiver) = mpsc::unbounded_channel::<InboundEvent>();
        tokio::spawn(run_worker(
            self.engine.clone(),
            self.queues.clone(),
            user,
            receiver,
            self.idle_timeout,
        ));
        sender
    }
}

async fn run_worker(
    engine: Arc<ConversationEngine>,
    queues: Queues,
    user: UserId,
    mut receiver: mpsc::UnboundedReceiver<InboundEvent>,
    idle_timeout: Duration,
) {
    loop {
        let event = match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                // `enqueue` sends while holding the map lock, so an empty
                // channel seen under the lock stays empty once the entry is gone.
                let mut queues = lock(&queues);
                match receiver.try_recv() {
                    Ok(event) => event,
                    Err(_) => {
                        queues.remove(&user);
                        debug!("Worker for user {} idle; shutting it down.", user);
                        break;
                    }
                }
            }
        };

        if let Err(e) = engine.handle(event).await {
            error!("Failed to deliver reply to user {}: {}", user, e);
        }
    }
}

fn lock(queues: &Queues) -> MutexGuard<'_, QueueMap> {
    queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use campaign_bot_core::conversation::{
        ACCESS_GRANTED, INVALID_OFFER_ID, MENU_PROMPT, OFFER_ID_PROMPT,
    };
    use campaign_bot_core::domain::{ChatId, EventKind, OutboundMessage};
    use campaign_bot_core::ports::{Messenger, PortError, PortResult, TrackingApi};
    use campaign_bot_core::tracking::{CampaignRecord, NewCampaign, NewStream, Offer};
    use campaign_bot_core::{
        AccessGate, Provisioner, ProvisioningSettings, ReplySettings, SessionStore,
    };
    use reqwest::Client;
    use secrecy::SecretString;

    struct UnreachableTracker;

    #[async_trait]
    impl TrackingApi for UnreachableTracker {
        async fn get_offer(&self, _offer_id: u64) -> PortResult<Offer> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn create_campaign(&self, _campaign: &NewCampaign) -> PortResult<CampaignRecord> {
            Err(PortError::Unexpected("offline".to_string()))
        }
        async fn create_stream(&self, _stream: &NewStream) -> PortResult<()> {
            Err(PortError::Unexpected("offline".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, chat: ChatId, message: OutboundMessage) -> PortResult<()> {
            self.sent.lock().unwrap().push((chat, message.text));
            Ok(())
        }
    }

    fn dispatcher(messenger: Arc<RecordingMessenger>) -> Dispatcher {
        dispatcher_with_idle(messenger, WORKER_IDLE_TIMEOUT)
    }

    fn dispatcher_with_idle(messenger: Arc<RecordingMessenger>, idle: Duration) -> Dispatcher {
        let engine = ConversationEngine::new(
            AccessGate::new(SecretString::new("pw".to_string())),
            SessionStore::new(),
            Provisioner::new(
                Arc::new(UnreachableTracker),
                ProvisioningSettings {
                    group_id: 1,
                    traffic_source_id: 1,
                    postback_url: String::new(),
                },
            ),
            messenger,
            ReplySettings {
                tracker_admin_url: String::new(),
                results_group: String::new(),
            },
        );
        let telegram = TelegramAdapter::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            SecretString::new("token".to_string()),
        );
        Dispatcher::with_idle_timeout(Arc::new(engine), Arc::new(telegram), idle)
    }

    fn event(user: i64, kind: EventKind) -> InboundEvent {
        InboundEvent {
            user: UserId(user),
            chat: ChatId(user),
            kind,
        }
    }

    async fn wait_for(messenger: &RecordingMessenger, count: usize) -> Vec<(ChatId, String)> {
        for _ in 0..200 {
            let sent = messenger.sent.lock().unwrap().clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {count} replies");
    }

    #[tokio::test]
    async fn events_for_one_user_run_in_arrival_order() {
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = dispatcher(messenger.clone());

        dispatcher.enqueue(event(1, EventKind::Text("pw".to_string())));
        dispatcher.enqueue(event(1, EventKind::Action("nda".to_string())));
        dispatcher.enqueue(event(1, EventKind::Text("abc".to_string())));

        let texts: Vec<String> = wait_for(&messenger, 4)
            .await
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            texts,
            vec![ACCESS_GRANTED, MENU_PROMPT, OFFER_ID_PROMPT, INVALID_OFFER_ID]
        );
    }

    #[tokio::test]
    async fn users_are_handled_independently() {
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = dispatcher(messenger.clone());

        dispatcher.enqueue(event(1, EventKind::Text("pw".to_string())));
        dispatcher.enqueue(event(2, EventKind::Text("nope".to_string())));

        let sent = wait_for(&messenger, 3).await;
        assert_eq!(sent.iter().filter(|(chat, _)| *chat == ChatId(1)).count(), 2);
        assert_eq!(sent.iter().filter(|(chat, _)| *chat == ChatId(2)).count(), 1);
    }

    async fn wait_for_workers(dispatcher: &Dispatcher, count: usize) {
        for _ in 0..200 {
            if dispatcher.active_workers() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} workers, found {}",
            dispatcher.active_workers()
        );
    }

    #[tokio::test]
    async fn idle_workers_are_reclaimed() {
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = dispatcher_with_idle(messenger.clone(), Duration::from_millis(50));

        for user in 0..100 {
            dispatcher.enqueue(event(user, EventKind::Text("nope".to_string())));
        }
        assert_eq!(dispatcher.active_workers(), 100);

        wait_for(&messenger, 100).await;
        wait_for_workers(&dispatcher, 0).await;
    }

    #[tokio::test]
    async fn user_state_survives_worker_restart() {
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = dispatcher_with_idle(messenger.clone(), Duration::from_millis(50));

        dispatcher.enqueue(event(1, EventKind::Text("pw".to_string())));
        wait_for(&messenger, 2).await;
        wait_for_workers(&dispatcher, 0).await;

        dispatcher.enqueue(event(1, EventKind::Action("nda".to_string())));
        let sent = wait_for(&messenger, 3).await;

        assert_eq!(sent[2].1, OFFER_ID_PROMPT);
    }
}
