use crate::{
    auth::TokenIssuer,
    config::AppConfig,
    error::Result,
    storage::{open_storage, Storage},
    store::{AccountRepository, SessionStore, TicketRepository, TicketStore},
};
use std::sync::Arc;

/// The stores a presentation layer needs, wired from configuration
#[derive(Clone)]
pub struct AppContext {
    pub tickets: Arc<dyn TicketRepository>,
    pub accounts: Arc<dyn AccountRepository>,
}

impl AppContext {
    /// Opens the configured storage, builds both stores and seeds sample tickets
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let storage = open_storage(&config.storage)?;
        let tokens = TokenIssuer::from_config(&config.session);
        Self::with_storage(storage, tokens, config.storage.seed_samples).await
    }

    /// Wires the stores over an already opened backend
    pub async fn with_storage(
        storage: Arc<dyn Storage>,
        tokens: TokenIssuer,
        seed_samples: bool,
    ) -> Result<Self> {
        let tickets = TicketStore::new(storage.clone());
        tickets.initialize(seed_samples).await?;
        let accounts = SessionStore::new(storage, tokens);

        tracing::info!(seed_samples, "ticket app initialized");
        Ok(Self {
            tickets: Arc::new(tickets),
            accounts: Arc::new(accounts),
        })
    }
}
