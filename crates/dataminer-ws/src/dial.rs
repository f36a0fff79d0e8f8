use std::sync::Arc;
use std::time::Duration;

use dataminer_http::HttpError;
use dataminer_ippool::IpPool;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{client_async_tls, MaybeTlsStream, WebSocketStream};

/// Dials the pool's current IP directly but negotiates TLS (and therefore
/// certificate verification) against `hostname`, via the request's own
/// host rather than the socket's peer address. Mirrors `dataminer-http`'s
/// `PinnedResolver`: the IP substitution happens below the verification
/// layer, never inside it.
pub async fn connect_pinned(
    hostname: &str,
    port: u16,
    path: &str,
    pool: &Arc<IpPool>,
    connect_timeout: Duration,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, HttpError> {
    let ip = pool
        .current()
        .await
        .map_err(|err| HttpError::Network(err.to_string()))?;

    let tcp = tokio::time::timeout(connect_timeout, TcpStream::connect((ip.as_str(), port)))
        .await
        .map_err(|_| HttpError::Timeout("websocket tcp connect".to_string()))?
        .map_err(|err| HttpError::Network(err.to_string()))?;

    let url = format!("wss://{hostname}:{port}{path}");
    let request = url
        .into_client_request()
        .map_err(|err| HttpError::Unknown(err.to_string()))?;

    let (stream, _response) = client_async_tls(request, tcp)
        .await
        .map_err(classify_tungstenite_error)?;

    Ok(stream)
}

fn classify_tungstenite_error(err: tokio_tungstenite::tungstenite::Error) -> HttpError {
    use tokio_tungstenite::tungstenite::Error as TError;
    match err {
        TError::Io(io_err) => HttpError::Network(io_err.to_string()),
        TError::Tls(tls_err) => HttpError::Tls(tls_err.to_string()),
        other => HttpError::Unknown(other.to_string()),
    }
}
