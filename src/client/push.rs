//! Push channel listener: every frame tells the facade to drop its views

use futures::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ClientError, ClientResult, LoanBackend, LoanFacade, RestBackend};

pub struct PushListener {
    url: String,
}

impl PushListener {
    /// Listener for the socket served next to `base_url`
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            url: push_url(base_url, token),
        }
    }

    pub fn for_backend(backend: &RestBackend) -> Self {
        Self::new(backend.base_url(), backend.token())
    }

    /// Run until the server closes the socket.
    ///
    /// Frame contents are not interpreted; any data frame invalidates the facade.
    pub async fn run<B: LoanBackend>(&self, facade: &LoanFacade<B>) -> ClientResult<()> {
        let (mut stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Push(format!("Failed to connect to push channel: {e}")))?;
        tracing::info!("Push channel connected");

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(_) | Message::Binary(_)) => {
                    tracing::debug!("Push event received, invalidating views");
                    facade.invalidate().await;
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "Push channel closed by server");
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(ClientError::Push(e.to_string())),
            }
        }

        Ok(())
    }
}

fn push_url(base_url: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/api/v1/notifications/ws?token={token}")
}
