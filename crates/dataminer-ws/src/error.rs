use std::fmt;

use dataminer_http::HttpError;

/// Stream-level decode failures; connection-level failures are classified
/// into `HttpError`'s existing `Network`/`Timeout`/`Tls` variants instead
/// of being duplicated here.
#[derive(Debug, Clone, PartialEq)]
pub enum WsProtocolError {
    UnknownStream(String),
    MissingField(&'static str),
    Malformed(String),
}

impl fmt::Display for WsProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsProtocolError::UnknownStream(name) => write!(f, "unrecognized stream payload: {name}"),
            WsProtocolError::MissingField(name) => write!(f, "missing field `{name}` in stream payload"),
            WsProtocolError::Malformed(msg) => write!(f, "malformed stream payload: {msg}"),
        }
    }
}

impl std::error::Error for WsProtocolError {}

#[derive(Debug, Clone)]
pub enum WsError {
    Connection(HttpError),
    Protocol(WsProtocolError),
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WsError::Connection(err) => write!(f, "websocket connection error: {err}"),
            WsError::Protocol(err) => write!(f, "websocket protocol error: {err}"),
        }
    }
}

impl std::error::Error for WsError {}

impl From<HttpError> for WsError {
    fn from(err: HttpError) -> Self {
        WsError::Connection(err)
    }
}

impl From<WsProtocolError> for WsError {
    fn from(err: WsProtocolError) -> Self {
        WsError::Protocol(err)
    }
}
