use axum::{
    extract::ws::{WebSocket, WebSocketUpgrade, Message},
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};
use crate::api::ApiError;
use crate::core::PriceFeedCore;
use crate::error::{Error, Result};
use crate::observability::tracing::trace_stream;
use crate::subscription::{Scope, Subscription};
use crate::types::ids::{CityId, ClientId, HotelId};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    client_id: Option<String>,
}

/// Control messages sent by the server outside the price stream.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage {
    Welcome { client_id: ClientId },
    Pong,
    Error { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Resubscribe,
    Ping,
}

pub async fn city_stream(
    ws: WebSocketUpgrade,
    State(core): State<Arc<PriceFeedCore>>,
    Path(city_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Response {
    open_stream(ws, core, Scope::City(CityId::new(city_id)), params)
}

pub async fn hotel_stream(
    ws: WebSocketUpgrade,
    State(core): State<Arc<PriceFeedCore>>,
    Path(hotel_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Response {
    open_stream(ws, core, Scope::Hotel(HotelId::new(hotel_id)), params)
}

/// Subscribes before upgrading so unknown scopes are answered with plain HTTP errors.
fn open_stream(ws: WebSocketUpgrade, core: Arc<PriceFeedCore>, scope: Scope, params: StreamParams) -> Response {
    let client_id = match params.client_id.as_deref().map(ClientId::from_string).transpose() {
        Ok(id) => id,
        Err(e) => return ApiError(Error::InvalidQuery(format!("client_id: {}", e))).into_response(),
    };

    match attach(&core, scope.clone(), client_id) {
        Ok(subscription) => ws.on_upgrade(move |socket| {
            let span = trace_stream(&subscription.client_id());
            handle_socket(socket, core, scope, subscription).instrument(span)
        }),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Resumes a known client on the same scope; anything else starts fresh.
fn attach(core: &PriceFeedCore, scope: Scope, client_id: Option<ClientId>) -> Result<Subscription> {
    let Some(client_id) = client_id else {
        return core.hub().subscribe(ClientId::new(), scope);
    };

    match core.hub().resume(client_id) {
        Ok(subscription) if subscription.scope() == &scope => return Ok(subscription),
        Ok(_) => debug!(client_id = %client_id, "Resume on a different scope, resubscribing"),
        Err(Error::SubscriptionNotFound(_)) | Err(Error::SubscriptionExpired(_)) => {
            debug!(client_id = %client_id, "Nothing to resume, subscribing")
        }
        Err(e) => return Err(e),
    }
    core.hub().subscribe(client_id, scope)
}

async fn handle_socket(socket: WebSocket, core: Arc<PriceFeedCore>, scope: Scope, mut subscription: Subscription) {
    let client_id = subscription.client_id();
    let (mut sender, mut receiver) = socket.split();
    info!(client_id = %client_id, scope = %scope, "Stream opened");

    if send_json(&mut sender, &ControlMessage::Welcome { client_id }).await.is_err() {
        core.hub().release(&subscription);
        return;
    }

    loop {
        tokio::select! {
            message = subscription.recv() => {
                // None once the hub dropped this attachment, e.g. for a newer connection.
                let Some(message) = message else {
                    break;
                };
                if send_json(&mut sender, &message).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };

                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => Some(ControlMessage::Pong),
                    Ok(ClientMessage::Resubscribe) => match core.hub().subscribe(client_id, scope.clone()) {
                        Ok(fresh) => {
                            subscription = fresh;
                            None
                        }
                        Err(e) => Some(ControlMessage::Error { message: e.to_string() }),
                    },
                    Err(e) => Some(ControlMessage::Error { message: format!("unrecognised message: {}", e) }),
                };
                if let Some(reply) = reply {
                    if send_json(&mut sender, &reply).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    core.hub().release(&subscription);
    info!(client_id = %client_id, "Stream closed");
}

async fn send_json<S, T>(sender: &mut S, message: &T) -> std::result::Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
    T: Serialize,
{
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize stream message: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
