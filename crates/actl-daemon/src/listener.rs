//! Unix socket accept loop: per-connection newline-delimited JSON framing,
//! `ping`/`auth` handled inline ahead of the dispatch table, everything
//! else routed through [`crate::dispatch::build_table`] once authenticated.

use std::path::Path;
use std::sync::Arc;

use actl_protocol::{bare_reply, encode_line, Framer, ReplyKind, RequestEnvelope};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::auth;
use crate::dispatch::{self, HandlerFn};
use crate::state::DaemonState;

/// Removes a stale socket file left behind by a previous, uncleanly
/// stopped daemon, then binds a fresh listener at `path`.
///
/// # Errors
///
/// Returns the underlying I/O error if the socket cannot be bound.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path)
}

/// Accepts connections until the process is asked to stop, spawning one
/// task per connection so a slow or hung client never blocks others.
pub async fn run(listener: UnixListener, state: Arc<DaemonState>) {
    let table = Arc::new(dispatch::build_table());
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                let table = Arc::clone(&table);
                tokio::spawn(async move {
                    handle_connection(stream, state, table).await;
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "accept failed");
            }
        }
    }
}

/// Per-connection session state: the account once authenticated, if any.
struct Session {
    account: Option<String>,
}

async fn handle_connection(mut stream: UnixStream, state: Arc<DaemonState>, table: Arc<std::collections::HashMap<&'static str, HandlerFn>>) {
    let mut framer = Framer::new();
    let mut buf = [0u8; 8192];
    let mut session = Session { account: None };

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                if let Some(account) = &session.account {
                    state.connected.lock().mark_disconnected(account);
                }
                return;
            }
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(error = %err, "connection read failed");
                if let Some(account) = &session.account {
                    state.connected.lock().mark_disconnected(account);
                }
                return;
            }
        };

        let mut replies = Vec::new();
        framer.feed(&buf[..n], |value| {
            replies.push(value);
        });

        for raw in replies {
            let reply = dispatch_one(&state, &table, &mut session, raw).await;
            let Ok(bytes) = encode_line(&reply) else {
                tracing::error!("failed to encode reply");
                continue;
            };
            if stream.write_all(&bytes).await.is_err() {
                if let Some(account) = &session.account {
                    state.connected.lock().mark_disconnected(account);
                }
                return;
            }
        }
    }
}

async fn dispatch_one(
    state: &Arc<DaemonState>,
    table: &std::collections::HashMap<&'static str, HandlerFn>,
    session: &mut Session,
    raw: Value,
) -> Value {
    let Some(envelope) = RequestEnvelope::parse(raw) else {
        return bare_reply(ReplyKind::Error, None);
    };

    match envelope.kind.as_str() {
        "ping" => return bare_reply(ReplyKind::Pong, envelope.request_id.as_deref()),
        "auth" => return handle_auth(state, session, &envelope),
        _ => {}
    }

    let Some(account) = session.account.clone() else {
        return bare_reply(ReplyKind::AuthFail, envelope.request_id.as_deref());
    };

    let Some(handler) = table.get(envelope.kind.as_str()) else {
        return actl_core::HubError::new(
            actl_core::ErrorCode::UnknownRequestType,
            format!("unknown request type: {}", envelope.kind),
        )
        .to_reply(envelope.request_id.as_deref());
    };

    handler(Arc::clone(state), account, envelope.request_id, envelope.raw).await
}

fn handle_auth(state: &Arc<DaemonState>, session: &mut Session, envelope: &RequestEnvelope) -> Value {
    let account = envelope.raw.get("account").and_then(Value::as_str);
    let token = envelope.raw.get("token").and_then(Value::as_str);
    let (Some(account), Some(token)) = (account, token) else {
        return bare_reply(ReplyKind::AuthFail, envelope.request_id.as_deref());
    };

    let token_path = state.paths.token_file(account);
    if !auth::verify_token(account, token, &token_path) {
        return bare_reply(ReplyKind::AuthFail, envelope.request_id.as_deref());
    }

    state.connected.lock().mark_connected(account, token);
    session.account = Some(account.to_string());
    bare_reply(ReplyKind::AuthOk, envelope.request_id.as_deref())
}
