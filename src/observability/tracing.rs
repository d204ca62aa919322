use tracing::Span;
use crate::types::ids::{ClientId, HotelId, SourceId};

pub fn trace_ingestion(hotel_id: &HotelId, source_id: &SourceId) -> Span {
    tracing::info_span!(
        "ingestion",
        hotel_id = %hotel_id,
        source_id = %source_id,
    )
}

pub fn trace_fanout(hotel_id: &HotelId, sequence: u64) -> Span {
    tracing::debug_span!(
        "fanout",
        hotel_id = %hotel_id,
        sequence,
    )
}

pub fn trace_stream(client_id: &ClientId) -> Span {
    tracing::info_span!(
        "stream",
        client_id = %client_id,
    )
}
