use crate::{
    auth::{hash_password, verify_password, SessionClaims, TokenIssuer},
    domain::{
        account::{normalize_email, require_field},
        Account, CurrentUser, SessionRecord,
    },
    error::{Result, TicketAppError},
    routes::{Access, Route, LOGIN_PATH},
    storage::{encode_records, Revision, Storage},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key of the account registry
pub const USERS_KEY: &str = "ticketapp_users";
/// Storage key of the active session
pub const SESSION_KEY: &str = "ticketapp_session";

/// Account registration and the single active session
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Registers an account and signs it in, returning the session token
    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<String>;

    /// Signs in an existing account, returning the session token
    async fn login(&self, email: &str, password: &str) -> Result<String>;

    /// Ends the active session, if any
    async fn logout(&self) -> Result<()>;

    /// True while a session exists and its token verifies
    async fn is_authenticated(&self) -> bool;

    /// Token of the active session
    async fn current_token(&self) -> Option<String>;

    /// The signed-in account
    async fn current_user(&self) -> Option<CurrentUser>;

    /// Gates a route on the current session
    async fn authorize(&self, route: &Route) -> Access {
        if route.requires_auth() && !self.is_authenticated().await {
            Access::Redirect(LOGIN_PATH)
        } else {
            Access::Granted
        }
    }
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    tokens: TokenIssuer,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenIssuer) -> Self {
        Self {
            storage,
            tokens,
            write_lock: Mutex::new(()),
        }
    }

    async fn load_accounts(&self) -> Result<(Revision, Vec<Account>)> {
        let collection = self.storage.read_collection(USERS_KEY).await?;
        let revision = collection.revision;
        Ok((revision, collection.decode()?))
    }

    /// Issues a token for `email` and records it as the active session.
    /// Callers must hold `write_lock`.
    async fn start_session(&self, email: &str) -> Result<String> {
        let token = self.tokens.issue(email)?;
        let record = SessionRecord {
            token: token.clone(),
            email: email.to_string(),
            issued_at: Utc::now(),
        };

        let current = self.storage.read_collection(SESSION_KEY).await?;
        self.storage
            .write_collection(SESSION_KEY, current.revision, &encode_records(&[record])?)
            .await?;
        Ok(token)
    }

    /// The stored session, if its token still verifies
    async fn active_session(&self) -> Option<(SessionRecord, SessionClaims)> {
        let records: Vec<SessionRecord> = match self.storage.read_collection(SESSION_KEY).await {
            Ok(collection) => match collection.decode() {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("failed to decode session: {}", e);
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!("failed to load session: {}", e);
                return None;
            }
        };

        let record = records.into_iter().next()?;
        match self.tokens.verify(&record.token) {
            Ok(claims) if claims.email() == record.email => Some((record, claims)),
            Ok(_) => {
                tracing::warn!("session token subject does not match session record");
                None
            }
            Err(e) => {
                tracing::debug!("session token rejected: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl AccountRepository for SessionStore {
    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<String> {
        require_field("email", email)?;
        require_field("password", password)?;
        require_field("name", name)?;
        let email = normalize_email(email);

        let _guard = self.write_lock.lock().await;
        let collection = self.storage.read_collection(USERS_KEY).await?;
        let previous = collection.records.clone();
        let revision = collection.revision;
        let mut accounts: Vec<Account> = collection.decode()?;
        if accounts.iter().any(|a| a.email == email) {
            return Err(TicketAppError::DuplicateAccount(email));
        }

        accounts.push(Account {
            email: email.clone(),
            password_hash: hash_password(password)?,
            name: name.trim().to_string(),
            created_at: Utc::now(),
        });
        let written = self
            .storage
            .write_collection(USERS_KEY, revision, &encode_records(&accounts)?)
            .await?;

        // A signup that cannot sign in is undone so it can be retried
        match self.start_session(&email).await {
            Ok(token) => {
                tracing::info!(email = %email, "account created");
                Ok(token)
            }
            Err(e) => {
                if let Err(rollback) = self
                    .storage
                    .write_collection(USERS_KEY, written, &previous)
                    .await
                {
                    tracing::error!(
                        email = %email,
                        "failed to remove account after session error: {}",
                        rollback
                    );
                }
                Err(e)
            }
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<String> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(TicketAppError::InvalidCredentials);
        }
        let email = normalize_email(email);

        let _guard = self.write_lock.lock().await;
        let (_, accounts) = self.load_accounts().await?;
        let verified = accounts
            .iter()
            .find(|a| a.email == email)
            .is_some_and(|a| verify_password(password, &a.password_hash));
        if !verified {
            tracing::debug!(email = %email, "login rejected");
            return Err(TicketAppError::InvalidCredentials);
        }

        self.start_session(&email).await
    }

    async fn logout(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let current = self.storage.read_collection(SESSION_KEY).await?;
        if current.records.is_empty() {
            return Ok(());
        }

        self.storage
            .write_collection(SESSION_KEY, current.revision, &[])
            .await?;
        Ok(())
    }

    async fn is_authenticated(&self) -> bool {
        self.active_session().await.is_some()
    }

    async fn current_token(&self) -> Option<String> {
        self.active_session().await.map(|(record, _)| record.token)
    }

    async fn current_user(&self) -> Option<CurrentUser> {
        let (record, _) = self.active_session().await?;
        match self.load_accounts().await {
            Ok((_, accounts)) => accounts
                .iter()
                .find(|a| a.email == record.email)
                .map(CurrentUser::from),
            Err(e) => {
                tracing::warn!("failed to load accounts: {}", e);
                None
            }
        }
    }
}
