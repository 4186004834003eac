#![forbid(unsafe_code)]

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} transport error: {detail}")]
pub struct TransportError {
    pub kind: &'static str,
    pub detail: String,
}

/// Every HTTP status comes back as an `HttpReply`; only failures to get a
/// response at all are a `TransportError`.
pub trait PushHttpTransport: Send + Sync {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, TransportError>;

    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError>;
}

impl<T: PushHttpTransport + ?Sized> PushHttpTransport for std::sync::Arc<T> {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
        (**self).post_form(url, form)
    }

    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        (**self).post_json(url, bearer_token, body)
    }
}

#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout_ms: u32, user_agent: &str) -> Self {
        let timeout = Duration::from_millis(u64::from(timeout_ms).max(100));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent }
    }
}

impl PushHttpTransport for UreqTransport {
    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpReply, TransportError> {
        reply_from_ureq(
            self.agent
                .post(url)
                .set("Accept", "application/json")
                .send_form(form),
        )
    }

    fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        reply_from_ureq(
            self.agent
                .post(url)
                .set("Content-Type", "application/json")
                .set("Accept", "application/json")
                .set("Authorization", &format!("Bearer {bearer_token}"))
                .send_json(body),
        )
    }
}

fn reply_from_ureq(
    result: Result<ureq::Response, ureq::Error>,
) -> Result<HttpReply, TransportError> {
    let response = match result {
        Ok(resp) => resp,
        Err(ureq::Error::Status(_, resp)) => resp,
        Err(ureq::Error::Transport(transport)) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            return Err(TransportError {
                kind: classify_transport_error_kind(&combined),
                detail: transport.to_string(),
            });
        }
    };
    let status = response.status();
    let body = response.into_string().map_err(|err| TransportError {
        kind: "body",
        detail: err.to_string(),
    })?;
    Ok(HttpReply { status, body })
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
