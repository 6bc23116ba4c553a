use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::{JwtVerifier, TokenSigner};
use common_store::{DocumentStore, Page};

use crate::config::ServiceConfig;
use crate::metrics::ServiceMetrics;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub jwt_verifier: Arc<JwtVerifier>,
    pub token_signer: Arc<TokenSigner>,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<ServiceMetrics>,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<TokenSigner> {
    fn from_ref(state: &AppState) -> Self {
        state.token_signer.clone()
    }
}

impl FromRef<AppState> for Arc<ServiceConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<ServiceMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl AppState {
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// List window for `limit`/`skip` query values.
    pub fn page(&self, limit: Option<i64>, skip: Option<u64>) -> Page {
        Page::resolve(limit, skip, self.config.default_find_limit)
    }

    pub fn record_login_metric(&self, account: &str, outcome: &str) {
        self.metrics.login_attempt(account, outcome);
    }
}
