use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;

use dataminer_http::HttpError;
use dataminer_ippool::IpPool;
use dataminer_model::RecordSink;

use crate::dial::connect_pinned;
use crate::error::WsError;
use crate::frame::decode_frame;

/// Classifies a mid-stream `tungstenite` error using the same taxonomy
/// `dataminer-http` uses for its transport errors, so reconnect decisions
/// and log `kind` fields stay consistent across the REST and stream paths.
fn classify_stream_error(err: tokio_tungstenite::tungstenite::Error) -> WsError {
    use tokio_tungstenite::tungstenite::Error as TError;
    let http_err = match err {
        TError::Io(io_err) => HttpError::Network(io_err.to_string()),
        TError::Tls(tls_err) => HttpError::Tls(tls_err.to_string()),
        TError::ConnectionClosed | TError::AlreadyClosed => {
            HttpError::Network("stream closed".to_string())
        }
        other => HttpError::Unknown(other.to_string()),
    };
    WsError::Connection(http_err)
}

/// Tunables for a single [`StreamClient`]. Mirrors `dataminer-http`'s
/// `HttpClientConfig` shape: bounded connect timeout plus a reconnect
/// backoff window instead of a retry-attempt count, since a stream client
/// reconnects indefinitely rather than giving up after N tries.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            port: 443,
            connect_timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Connects to one combined-stream WebSocket endpoint, decodes every frame
/// into a canonical [`dataminer_model::Record`], and delivers it to a sink.
/// Dials through the same [`IpPool`] pinning contract `dataminer-http` uses,
/// reconnecting with exponential backoff on any connection-level error.
pub struct StreamClient {
    exchange: String,
    hostname: String,
    path: String,
    pool: Arc<IpPool>,
    sink: Arc<dyn RecordSink>,
    config: StreamClientConfig,
}

impl StreamClient {
    pub fn new(
        exchange: impl Into<String>,
        hostname: impl Into<String>,
        streams: &[String],
        pool: Arc<IpPool>,
        sink: Arc<dyn RecordSink>,
        config: StreamClientConfig,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            hostname: hostname.into(),
            path: combined_stream_path(streams),
            pool,
            sink,
            config,
        }
    }

    /// Runs the connect/decode/reconnect loop until `shutdown` is notified.
    /// Each decode failure drops the offending frame (logged, not fatal);
    /// each connection failure triggers a reconnect after an exponentially
    /// growing backoff that resets to `initial_backoff` on every
    /// successful connection.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut backoff = self.config.initial_backoff;

        loop {
            tokio::select! {
                _ = shutdown.notified() => return,
                result = self.connect_once() => {
                    match result {
                        Ok(()) => {
                            backoff = self.config.initial_backoff;
                        }
                        Err(err) => {
                            tracing::warn!(
                                exchange = %self.exchange,
                                hostname = %self.hostname,
                                error = %err,
                                backoff_ms = backoff.as_millis() as u64,
                                "stream connection lost, reconnecting"
                            );
                        }
                    }
                }
            }

            tokio::select! {
                _ = shutdown.notified() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }

    async fn connect_once(&self) -> Result<(), WsError> {
        let mut stream = connect_pinned(
            &self.hostname,
            self.config.port,
            &self.path,
            &self.pool,
            self.config.connect_timeout,
        )
        .await?;

        tracing::info!(exchange = %self.exchange, hostname = %self.hostname, "stream connected");

        while let Some(message) = stream.next().await {
            let message = message.map_err(classify_stream_error)?;

            match message {
                Message::Text(text) => match decode_frame(&self.exchange, &text) {
                    Ok(record) => self.sink.deliver(record),
                    Err(err) => {
                        tracing::warn!(exchange = %self.exchange, error = %err, "dropping undecodable stream frame");
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }
}

/// Binance's combined-stream path format: `/stream?streams=a/b/c`.
fn combined_stream_path(streams: &[String]) -> String {
    format!("/stream?streams={}", streams.join("/"))
}
