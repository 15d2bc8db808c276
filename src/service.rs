//! Composition root wiring the store, caches, and flows together.

use std::sync::Arc;

use crate::accounts::AccountManager;
use crate::config::AuthConfig;
use crate::csrf::CsrfGuard;
use crate::session::SessionStore;
use crate::store::Database;
use crate::webauthn::{CredentialVerifier, PasskeyService};

/// Long-lived auth core, constructed once at startup and shared into
/// request handlers. All caches live inside; there is no process-global
/// state.
pub struct AuthService<D, V> {
    config: AuthConfig,
    sessions: SessionStore<D>,
    accounts: AccountManager<D>,
    csrf: CsrfGuard,
    passkeys: PasskeyService<D, V>,
}

impl<D: Database, V: CredentialVerifier> AuthService<D, V> {
    #[must_use]
    pub fn new(config: AuthConfig, db: Arc<D>, verifier: Arc<V>) -> Self {
        // One session store shared by every flow, so password and passkey
        // logins mint sessions through the same caches.
        let sessions = SessionStore::new(Arc::clone(&db), &config);
        let accounts = AccountManager::new(Arc::clone(&db), sessions.clone(), &config);
        let csrf = CsrfGuard::new(&config);
        let passkeys = PasskeyService::new(db, verifier, sessions.clone(), &config);
        Self {
            config,
            sessions,
            accounts,
            csrf,
            passkeys,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore<D> {
        &self.sessions
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountManager<D> {
        &self.accounts
    }

    #[must_use]
    pub fn csrf(&self) -> &CsrfGuard {
        &self.csrf
    }

    #[must_use]
    pub fn passkeys(&self) -> &PasskeyService<D, V> {
        &self.passkeys
    }
}
