// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthLayerConfig;
use crate::blockchain::RpcClient;
use crate::clock::Clock;
use crate::config::{DEFAULT_CHAIN_ID, DEFAULT_SESSION_TTL};
use crate::confirmation::ConfirmationHandler;
use crate::hooks::HookRegistry;
use crate::sessions::SessionStore;

/// What this server advertises as an OAuth protected resource.
#[derive(Debug, Clone, Default)]
pub struct ProtectedResource {
    /// Canonical resource identifier (base URL)
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
}

/// Defaults applied to newly created sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionDefaults {
    pub ttl: chrono::Duration,
    pub chain_id: u64,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::from_std(DEFAULT_SESSION_TTL).unwrap_or(chrono::Duration::MAX),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub hooks: Arc<HookRegistry>,
    pub confirmations: Arc<ConfirmationHandler>,
    pub rpc: Option<Arc<RpcClient>>,
    pub auth: AuthLayerConfig,
    pub clock: Arc<dyn Clock>,
    pub resource: ProtectedResource,
    pub session_defaults: SessionDefaults,
    /// Directory of the session database, when persistent
    pub data_dir: Option<PathBuf>,
    require_ownership_proof: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        hooks: HookRegistry,
        auth: AuthLayerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hooks = Arc::new(hooks);
        let confirmations = Arc::new(ConfirmationHandler::new(
            store.clone(),
            hooks.clone(),
            None,
            clock.clone(),
        ));
        Self {
            store,
            hooks,
            confirmations,
            rpc: None,
            auth,
            clock,
            resource: ProtectedResource::default(),
            session_defaults: SessionDefaults::default(),
            data_dir: None,
            require_ownership_proof: false,
        }
    }

    /// Use `rpc` for chain reads and ownership proofs.
    pub fn with_rpc(mut self, rpc: Option<Arc<RpcClient>>) -> Self {
        self.rpc = rpc;
        self.rebuild_confirmations();
        self
    }

    pub fn with_required_ownership_proof(mut self, required: bool) -> Self {
        self.require_ownership_proof = required;
        self.rebuild_confirmations();
        self
    }

    pub fn with_session_defaults(mut self, ttl: Duration, chain_id: u64) -> Self {
        self.session_defaults = SessionDefaults {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            chain_id,
        };
        self
    }

    pub fn with_resource(mut self, resource: ProtectedResource) -> Self {
        self.resource = resource;
        self
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    fn rebuild_confirmations(&mut self) {
        self.confirmations = Arc::new(
            ConfirmationHandler::new(
                self.store.clone(),
                self.hooks.clone(),
                self.rpc.clone(),
                self.clock.clone(),
            )
            .with_required_ownership_proof(self.require_ownership_proof),
        );
    }
}

/// In-memory state with no JWKS, no RPC and the reference hooks.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use crate::auth::{JwksCache, JwtAuthenticator};
    use crate::clock::SystemClock;
    use crate::hooks::{default_registry, ConfirmationLedger};
    use crate::sessions::InMemorySessionStore;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jwks = JwksCache::new(None, Duration::from_secs(1), clock.clone()).unwrap();
    let auth = AuthLayerConfig::new(Arc::new(JwtAuthenticator::new(Arc::new(jwks), clock.clone())));
    let hooks = default_registry(Arc::new(ConfirmationLedger::new())).unwrap();

    AppState::new(Arc::new(InMemorySessionStore::new()), hooks, auth, clock)
}
