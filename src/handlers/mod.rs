//! Lambda entry logic, kept out of the binaries so it runs against fakes in tests.

pub mod alarm_consumer;
pub mod jobs;
pub mod shift_stream;

use crate::alarm::AlarmScheduler;
use crate::config::Config;
use crate::error::Result;
use crate::notify::WebhookNotifier;
use crate::store::DynamoStore;
use crate::timer::EventBridgeTimer;

pub type LiveScheduler = AlarmScheduler<DynamoStore, EventBridgeTimer, WebhookNotifier>;

/// Adapters wired from the environment, built once per cold start.
pub struct App {
    pub config: Config,
    pub store: DynamoStore,
}

impl App {
    pub async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        let store = DynamoStore::from_config(&config).await;
        Ok(Self { config, store })
    }

    pub async fn alarm_scheduler(&self) -> LiveScheduler {
        AlarmScheduler::new(
            self.store.clone(),
            EventBridgeTimer::from_config(&self.config).await,
            WebhookNotifier::new(self.config.notify_endpoint.clone()),
            self.config.alarms,
        )
    }
}
