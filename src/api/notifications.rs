//! Notification endpoints and the push socket

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{Notification, NotificationsPage},
    services::push::PushHub,
    AppState,
};

use super::{verify_token, AuthenticatedUser, PageQuery, DEFAULT_PAGE_SIZE};

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Notifications with unread count", body = NotificationsPage)
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<NotificationsPage>> {
    query.validate()?;

    let page = state
        .services
        .notifications
        .list(
            claims.user_id(),
            query.skip.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(page))
}

/// Mark a notification as read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification = state
        .services
        .notifications
        .mark_read(id, claims.user_id())
        .await?;
    Ok(Json(notification))
}

/// Browsers cannot set headers on a WebSocket handshake, so the JWT rides in the query
#[derive(Debug, Deserialize)]
pub struct PushQuery {
    pub token: String,
}

/// Upgrade to the push socket. Every frame is `{"type":"new_notification"}`.
pub async fn push_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<PushQuery>,
) -> AppResult<impl IntoResponse> {
    let claims = verify_token(&query.token, &state)?;
    let hub = state.services.notifications.hub().clone();
    let user_id = claims.user_id();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, user_id)))
}

async fn handle_socket(socket: WebSocket, hub: Arc<PushHub>, user_id: Uuid) {
    let conn_id = Uuid::new_v4();
    tracing::info!(conn_id = %conn_id, user_id = %user_id, "Push socket connected");

    let mut rx = hub.add(conn_id, user_id).await;
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %conn_id, "Push socket sink closed");
                break;
            }
        }
    });

    // Inbound frames carry nothing; read only to notice the close.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Push socket receive error");
                break;
            }
        }
    }

    hub.remove(conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Push socket disconnected");
}
