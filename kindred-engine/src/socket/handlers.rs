use std::sync::Arc;

use serde::Serialize;
use socketioxide::extract::{Data, SocketRef};
use uuid::Uuid;

use crate::participation::conversations;
use crate::socket::fanout::Scope;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

fn emit_error(socket: &SocketRef, code: &str, message: impl Into<String>) {
    let _ = socket.emit(
        "error",
        &ErrorPayload {
            code: code.into(),
            message: message.into(),
        },
    );
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

/// Validate the handshake token (`?token=<jwt>`) and return the user id.
fn authenticate_socket(socket: &SocketRef, state: &Arc<AppState>) -> Result<Uuid, String> {
    let query = socket.req_parts().uri.query().unwrap_or_default();
    let token = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value)
        .ok_or_else(|| "missing token query parameter".to_string())?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    let decoded = jsonwebtoken::decode::<kindred_shared::types::auth::Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("invalid token: {e}"))?;

    if decoded.claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(decoded.claims.sub)
}

pub async fn on_connect_with_state(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match authenticate_socket(&socket, &state) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "engine socket auth failed");
            emit_error(&socket, "AUTH_FAILED", msg);
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(user_id);

    // Every connected user sits in their own room so transitions can be
    // pushed without tracking socket ids.
    socket.join(Scope::User(user_id).room()).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "engine socket connected");

    let _ = state.presence.mark_online(user_id).await;
    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    // Clients opt into the audience rooms of the events they look at.
    socket.on(
        "subscribe-event",
        |socket: SocketRef, Data::<serde_json::Value>(payload)| async move {
            if get_user_id(&socket).is_none() {
                return;
            }
            if let Some(event_id) = parse_id(&payload, "event_id") {
                socket.join(Scope::Event(event_id).room()).ok();
            }
        },
    );

    socket.on(
        "unsubscribe-event",
        |socket: SocketRef, Data::<serde_json::Value>(payload)| async move {
            if let Some(event_id) = parse_id(&payload, "event_id") {
                socket.leave(Scope::Event(event_id).room()).ok();
            }
        },
    );

    // Conversation rooms require active membership.
    socket.on("subscribe-conversation", {
        let state = state.clone();
        move |socket: SocketRef, Data::<serde_json::Value>(payload)| {
            let state = state.clone();
            async move {
                on_subscribe_conversation(socket, payload, &state);
            }
        }
    });

    socket.on("heartbeat", {
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    let _ = state.presence.mark_online(user_id).await;
                }
            }
        }
    });

    socket.on_disconnect({
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    tracing::info!(user_id = %user_id, sid = %socket.id, "engine socket disconnected");
                    let _ = state.presence.mark_offline(user_id).await;
                }
            }
        }
    });
}

fn on_subscribe_conversation(socket: SocketRef, payload: serde_json::Value, state: &Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    let conversation_id = match parse_id(&payload, "conversation_id") {
        Some(id) => id,
        None => {
            tracing::warn!("subscribe-conversation missing conversation_id");
            return;
        }
    };

    let mut conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "failed to get db connection for socket subscribe");
            return;
        }
    };

    match conversations::is_active_member(&mut conn, conversation_id, user_id) {
        Ok(true) => {
            socket.join(Scope::Conversation(conversation_id).room()).ok();
        }
        Ok(false) => {
            emit_error(&socket, "NOT_MEMBER", "you are not a member of this conversation");
        }
        Err(e) => {
            tracing::error!(error = %e, conversation_id = %conversation_id, "membership check failed");
        }
    }
}

fn parse_id(payload: &serde_json::Value, field: &str) -> Option<Uuid> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}
