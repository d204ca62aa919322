use async_trait::async_trait;
use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use crate::error::{Error, Result};
use crate::events::observation::RawObservation;
use crate::feeds::PriceConnector;
use crate::types::ids::{CityId, HotelId, SourceId};
use crate::types::timestamp::Timestamp;

/// Push feed delivering one JSON observation per text frame.
pub struct WebSocketConnector {
    source_id: SourceId,
    url: String,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketConnector {
    pub fn new(source_id: SourceId, url: String) -> Self {
        WebSocketConnector {
            source_id,
            url,
            stream: None,
        }
    }
}

#[async_trait]
impl PriceConnector for WebSocketConnector {
    async fn connect(&mut self) -> Result<()> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::ConnectionFailed(format!("WebSocket connection failed: {}", e)))?;
        self.stream = Some(ws_stream);
        tracing::info!("Connected to price feed {}: {}", self.source_id, self.url);
        Ok(())
    }

    async fn next_observation(&mut self) -> Result<RawObservation> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        loop {
            let Some(msg) = stream.next().await else {
                self.stream = None;
                return Err(Error::ConnectionClosed);
            };
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    self.stream = None;
                    return Err(Error::ConnectionFailed(e.to_string()));
                }
            };

            match msg {
                Message::Text(text) => return parse_frame(&text, &self.source_id),
                Message::Close(_) => {
                    self.stream = None;
                    return Err(Error::ConnectionClosed);
                }
                _ => continue,
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.stream.is_some()
    }

    fn source_id(&self) -> &SourceId {
        &self.source_id
    }
}

#[derive(Deserialize)]
struct FeedFrame {
    hotel_id: HotelId,
    city_id: CityId,
    timestamp: Timestamp,
    price: Decimal,
    #[serde(default = "default_available")]
    available: bool,
    source_id: Option<SourceId>,
}

fn default_available() -> bool {
    true
}

/// Frames without a `source_id` are attributed to the connection's source.
fn parse_frame(text: &str, default_source: &SourceId) -> Result<RawObservation> {
    let frame: FeedFrame = serde_json::from_str(text)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;

    Ok(RawObservation {
        hotel_id: frame.hotel_id,
        city_id: frame.city_id,
        timestamp: frame.timestamp,
        price: frame.price,
        available: frame.available,
        source_id: frame.source_id.unwrap_or_else(|| default_source.clone()),
    })
}
