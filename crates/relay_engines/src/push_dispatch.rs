#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::env;
use std::sync::{Mutex, MutexGuard};

use relay_kernel_contracts::push::{
    CachedAccessToken, PushConfig, ServiceCredential, DEFAULT_TOKEN_URI,
};
use relay_kernel_contracts::{ContractViolation, Validate};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assertion::{sign_assertion, AssertionClaims};
use crate::clock::{Clock, SystemClock};
use crate::http_transport::{HttpReply, PushHttpTransport, TransportError, UreqTransport};

pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DEFAULT_MESSAGING_BASE_URL: &str = "https://fcm.googleapis.com";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const HTTP_TIMEOUT_MS_DEFAULT: u32 = 10_000;
const USER_AGENT: &str = concat!("ussd-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushDispatcherConfig {
    pub messaging_base_url: String,
    pub default_token_uri: String,
    pub scope: String,
    pub http_timeout_ms: u32,
    pub token_lifetime_s: u64,
    pub token_refresh_margin_s: u64,
}

impl PushDispatcherConfig {
    pub fn mvp_v1() -> Self {
        Self {
            messaging_base_url: DEFAULT_MESSAGING_BASE_URL.to_string(),
            default_token_uri: DEFAULT_TOKEN_URI.to_string(),
            scope: MESSAGING_SCOPE.to_string(),
            http_timeout_ms: HTTP_TIMEOUT_MS_DEFAULT,
            token_lifetime_s: 3_600,
            token_refresh_margin_s: 300,
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::mvp_v1();
        if let Some(base) = non_empty_env("USSD_RELAY_FCM_BASE_URL") {
            config.messaging_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(uri) = non_empty_env("USSD_RELAY_TOKEN_URI") {
            config.default_token_uri = uri;
        }
        config.http_timeout_ms = env::var("USSD_RELAY_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| (100..=120_000).contains(v))
            .unwrap_or(HTTP_TIMEOUT_MS_DEFAULT);
        config
    }

    fn cached_ttl_ms(&self) -> u64 {
        self.token_lifetime_s
            .saturating_sub(self.token_refresh_margin_s)
            .saturating_mul(1_000)
    }
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid push config: {0}")]
    InvalidConfig(#[from] ContractViolation),
    #[error("authorization assertion could not be signed: {0}")]
    Signing(String),
    #[error("token exchange failed with http status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },
    #[error("token endpoint response did not contain an access_token")]
    TokenResponseMalformed,
    #[error("push dispatch failed with http status {status}: {body}")]
    DispatchFailed { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Signs service-credential assertions, caches the bearer token it gets back,
/// and sends data-only messages to one device token.
///
/// The token cache lock is held across the exchange so concurrent callers
/// never both refresh.
#[derive(Debug)]
pub struct PushDispatcher<T, C = SystemClock> {
    config: PushDispatcherConfig,
    transport: T,
    clock: C,
    token_cache: Mutex<Option<CachedAccessToken>>,
}

impl PushDispatcher<UreqTransport, SystemClock> {
    pub fn production(config: PushDispatcherConfig) -> Self {
        let transport = UreqTransport::new(config.http_timeout_ms, USER_AGENT);
        Self::new(config, transport, SystemClock)
    }
}

impl<T, C> PushDispatcher<T, C>
where
    T: PushHttpTransport,
    C: Clock,
{
    pub fn new(config: PushDispatcherConfig, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
            token_cache: Mutex::new(None),
        }
    }

    pub fn send_url(&self, project_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.messaging_base_url, project_id
        )
    }

    pub fn get_access_token(&self, credential: &ServiceCredential) -> Result<String, PushError> {
        credential.validate()?;
        let now_ms = self.clock.now_unix_ms();
        let mut cache = self.lock_cache();
        if let Some(cached) = cache.as_ref() {
            if cached.is_live_for(&credential.client_email, now_ms) {
                debug!(subject = %credential.client_email, "access token cache hit");
                return Ok(cached.token.clone());
            }
        }

        let token = self.exchange_assertion(credential, now_ms)?;
        *cache = Some(CachedAccessToken {
            subject_email: credential.client_email.clone(),
            token: token.clone(),
            expires_at_unix_ms: now_ms.saturating_add(self.config.cached_ttl_ms()),
        });
        info!(subject = %credential.client_email, "access token refreshed");
        Ok(token)
    }

    /// Single POST; a 2xx reply is the only acknowledgement there is.
    pub fn send(
        &self,
        config: &PushConfig,
        data: &BTreeMap<String, String>,
    ) -> Result<(), PushError> {
        config.validate()?;
        let token = self.get_access_token(&config.service_credential)?;
        let body = json!({
            "message": {
                "token": config.device_token,
                "data": data,
                "android": { "priority": "high" },
            }
        });
        let url = self.send_url(&config.service_credential.project_id);
        let reply = self.transport.post_json(&url, &token, &body)?;
        if !reply.is_success() {
            warn!(status = reply.status, "push dispatch rejected");
            return Err(PushError::DispatchFailed {
                status: reply.status,
                body: reply.body,
            });
        }
        info!(project = %config.service_credential.project_id, "push dispatched");
        Ok(())
    }

    fn exchange_assertion(
        &self,
        credential: &ServiceCredential,
        now_ms: u64,
    ) -> Result<String, PushError> {
        let token_uri = credential.token_uri_or(&self.config.default_token_uri);
        let issued_at = now_ms / 1_000;
        let claims = AssertionClaims {
            iss: &credential.client_email,
            scope: &self.config.scope,
            aud: token_uri,
            iat: issued_at,
            exp: issued_at.saturating_add(self.config.token_lifetime_s),
        };
        let assertion = sign_assertion(credential, &claims).map_err(PushError::Signing)?;
        let reply = self.transport.post_form(
            token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
        )?;
        if !reply.is_success() {
            warn!(
                status = reply.status,
                subject = %credential.client_email,
                "token exchange rejected"
            );
            return Err(PushError::TokenExchangeFailed {
                status: reply.status,
                body: reply.body,
            });
        }
        access_token_from_reply(&reply)
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedAccessToken>> {
        self.token_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn access_token_from_reply(reply: &HttpReply) -> Result<String, PushError> {
    let root: Value =
        serde_json::from_str(&reply.body).map_err(|_| PushError::TokenResponseMalformed)?;
    root.get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(PushError::TokenResponseMalformed)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
