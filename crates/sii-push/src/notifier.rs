use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::{debug, info};

use sii_types::push::PushPayload;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("push transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push gateway rejected the notification with status {status}")]
    Rejected { status: u16 },
}

/// Delivers one payload to one device.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, token: &str, payload: &PushPayload) -> Result<(), NotifyError>;
}

/// Message posted to the push gateway.
#[derive(Serialize)]
struct PushMessage<'a> {
    to: &'a str,
    priority: &'static str,
    data: &'a PushPayload,
}

/// Posts notifications to an HTTP push gateway (FCM-style `{to, data}` body).
pub struct HttpPushNotifier {
    client: reqwest::Client,
    endpoint: String,
    server_key: Option<String>,
}

impl HttpPushNotifier {
    pub fn new(endpoint: impl Into<String>, server_key: Option<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            server_key,
        })
    }
}

#[async_trait]
impl Notifier for HttpPushNotifier {
    async fn notify(&self, token: &str, payload: &PushPayload) -> Result<(), NotifyError> {
        let mut req = self.client.post(&self.endpoint).json(&PushMessage {
            to: token,
            priority: "high",
            data: payload,
        });
        if let Some(key) = &self.server_key {
            req = req.header(AUTHORIZATION, format!("key={}", key));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Push {} delivered to gateway ({})", payload.kind(), status);
        Ok(())
    }
}

/// Used when no push gateway is configured: records the notification in the
/// log and reports success.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, token: &str, payload: &PushPayload) -> Result<(), NotifyError> {
        info!(token, kind = payload.kind(), "push not sent, no gateway configured: {:?}", payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn payload() -> PushPayload {
        PushPayload::NotifyVictim {
            helper_user_id: "h1".into(),
            lat: 10.0,
            long: 20.0,
        }
    }

    /// Accepts one connection, captures the raw request and answers with `status_line`.
    async fn one_shot_gateway(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let reply = format!("HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n", status_line);
            sock.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });

        (url, handle)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        buf.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn posts_token_and_payload_with_key() {
        let (url, gateway) = one_shot_gateway("200 OK").await;
        let notifier = HttpPushNotifier::new(url, Some("secret".into()), Duration::from_secs(5)).unwrap();

        notifier.notify("tok-1", &payload()).await.unwrap();

        let request = gateway.await.unwrap();
        assert!(request.starts_with("POST /send"));
        assert!(request.to_ascii_lowercase().contains("authorization: key=secret"));
        assert!(request.contains(r#""to":"tok-1""#));
        assert!(request.contains(r#""kind":"NOTIFY_VICTIM""#));
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (url, _gateway) = one_shot_gateway("503 Service Unavailable").await;
        let notifier = HttpPushNotifier::new(url, None, Duration::from_secs(5)).unwrap();

        let err = notifier.notify("tok-1", &payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 503 }));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());
        drop(listener);

        let notifier = HttpPushNotifier::new(url, None, Duration::from_secs(5)).unwrap();
        let err = notifier.notify("tok-1", &payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.notify("tok", &payload()).await.is_ok());
    }
}
