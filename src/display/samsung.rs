//! Samsung Frame transport (REST device info + WebSocket channels)
//!
//! Port 8002 speaks TLS with a self-signed certificate, 8001 is plain.
//! Every call below opens its own connection and drops it before returning;
//! long-lived sockets to the Frame go stale (`No route to host`) after the
//! TV sleeps, even once it is reachable again.

use async_trait::async_trait;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{DisplayError, FrameTransport};
use crate::config::DisplayConfig;

type FrameSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TLS_PORT: u16 = 8002;
const ART_CHANNEL: &str = "com.samsung.art-app";
const REMOTE_CHANNEL: &str = "samsung.remote.control";

/// Connection parameters for one Frame TV
#[derive(Debug, Clone)]
pub struct SamsungFrame {
    host: String,
    port: u16,
    token_file: Option<PathBuf>,
    client_name: String,
    timeout: Duration,
}

impl SamsungFrame {
    pub fn new(host: impl Into<String>, port: u16, token_file: Option<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            token_file,
            client_name: "FrameWatcher".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            token_file: config.token_file.clone(),
            client_name: config.client_name.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn uses_tls(&self) -> bool {
        self.port == TLS_PORT
    }

    pub fn rest_url(&self) -> String {
        let scheme = if self.uses_tls() { "https" } else { "http" };
        format!("{}://{}:{}/api/v2/", scheme, self.host, self.port)
    }

    pub fn channel_url(&self, channel: &str, token: Option<&str>) -> String {
        let scheme = if self.uses_tls() { "wss" } else { "ws" };
        let name = base64::engine::general_purpose::STANDARD.encode(self.client_name.as_bytes());
        let mut url = format!(
            "{}://{}:{}/api/v2/channels/{}?name={}",
            scheme, self.host, self.port, channel, name
        );
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }

    /// Read the pairing token fresh; a missing or empty file means "no token"
    pub async fn read_token(&self) -> Result<Option<String>, DisplayError> {
        let Some(path) = &self.token_file else {
            return Ok(None);
        };

        match tokio::fs::read_to_string(path).await {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Token file {} not found, connecting without token", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open_channel(&self, channel: &str) -> Result<FrameSocket, DisplayError> {
        let token = self.read_token().await?;
        let url = self.channel_url(channel, token.as_deref());

        let connector = if self.uses_tls() {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?;
            Some(Connector::NativeTls(tls))
        } else {
            None
        };

        debug!("Opening Frame channel {}", channel);
        let (socket, _) =
            tokio_tungstenite::connect_async_tls_with_config(url, None, false, connector).await?;
        Ok(socket)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, DisplayError>
    where
        F: std::future::Future<Output = Result<T, DisplayError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| DisplayError::Timeout(self.timeout))?
    }
}

/// Read messages until one carries `event`; channel errors abort
async fn wait_for_event(socket: &mut FrameSocket, event: &str) -> Result<Value, DisplayError> {
    loop {
        let text = match socket.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return Err(DisplayError::ChannelClosed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        };

        let message: Value = serde_json::from_str(&text)?;
        let name = message
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_owned);
        match name.as_deref() {
            Some(name) if name == event => return Ok(message),
            Some("ms.error") | Some("ms.channel.unauthorized") | Some("ms.channel.timeOut") => {
                return Err(DisplayError::Channel(text));
            }
            other => debug!("Skipping Frame event {:?}", other),
        }
    }
}

/// `art_app_request` asking for the current art mode
pub fn art_mode_request(request_id: &str) -> Value {
    let inner = json!({
        "request": "get_artmode_status",
        "id": request_id,
    });
    json!({
        "method": "ms.channel.emit",
        "params": {
            "event": "art_app_request",
            "to": "host",
            "data": inner.to_string(),
        }
    })
}

/// Extract the art mode value from a `d2d_service_message`.
///
/// Returns `None` for messages that answer something else (the art channel
/// also broadcasts unrelated events), so the caller keeps reading. An
/// `error` event for our request ends the exchange.
pub fn art_mode_reply(message: &Value, request_id: &str) -> Option<Result<String, DisplayError>> {
    let data = message.get("data")?;
    let inner: Value = match data {
        Value::String(s) => serde_json::from_str(s).ok()?,
        other => other.clone(),
    };

    let id = inner.get("id").and_then(Value::as_str);
    if id.is_some_and(|id| id != request_id) {
        return None;
    }

    match inner.get("event").and_then(Value::as_str) {
        Some("artmode_status") => Some(
            inner
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(DisplayError::MissingField("value")),
        ),
        // Sent instead of a status when art mode is unavailable
        Some("error") if id.is_some() => Some(Err(DisplayError::Channel(inner.to_string()))),
        _ => None,
    }
}

/// `ms.remote.control` click for a remote key
pub fn remote_key_click(key: &str) -> Value {
    json!({
        "method": "ms.remote.control",
        "params": {
            "Cmd": "Click",
            "DataOfCmd": key,
            "Option": "false",
            "TypeOfRemote": "SendRemoteKey",
        }
    })
}

#[async_trait]
impl FrameTransport for SamsungFrame {
    async fn power_state_field(&self) -> Result<Option<String>, DisplayError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()?;

        let info: Value = client
            .get(self.rest_url())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let device = info
            .get("device")
            .ok_or(DisplayError::MissingField("device"))?;
        Ok(device
            .get("PowerState")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn art_mode(&self) -> Result<String, DisplayError> {
        self.bounded(async {
            let mut socket = self.open_channel(ART_CHANNEL).await?;
            wait_for_event(&mut socket, "ms.channel.ready").await?;

            let request_id = uuid::Uuid::new_v4().to_string();
            socket
                .send(Message::Text(art_mode_request(&request_id).to_string()))
                .await?;

            let mode = loop {
                let message = wait_for_event(&mut socket, "d2d_service_message").await?;
                if let Some(reply) = art_mode_reply(&message, &request_id) {
                    break reply?;
                }
            };

            let _ = socket.close(None).await;
            Ok::<_, DisplayError>(mode)
        })
        .await
    }

    async fn send_power_key(&self) -> Result<(), DisplayError> {
        self.bounded(async {
            let mut socket = self.open_channel(REMOTE_CHANNEL).await?;
            wait_for_event(&mut socket, "ms.channel.connect").await?;

            socket
                .send(Message::Text(remote_key_click("KEY_POWER").to_string()))
                .await?;
            debug!("Sent KEY_POWER to {}", self.host);

            let _ = socket.close(None).await;
            Ok::<_, DisplayError>(())
        })
        .await
    }
}
