use axum::{
    Router,
    routing::{get, post, delete},
    extract::{Path, Query, State, Json},
    http::{header, StatusCode},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use crate::aggregation::CityStatistics;
use crate::alerts::{NewAlert, PriceAlert};
use crate::api::websocket::{city_stream, hotel_stream};
use crate::api::ApiError;
use crate::core::{HotelListing, PriceFeedCore};
use crate::error::Error;
use crate::events::observation::PricePoint;
use crate::events::snapshot::{AggregateSnapshot, HourBucket};
use crate::observability::metrics::encode_metrics;
use crate::types::ids::{AlertId, CityId, HotelId};
use crate::types::timestamp::Timestamp;

type ApiResult<T> = Result<T, ApiError>;

pub fn create_router(core: Arc<PriceFeedCore>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        // One parameter name per segment: a city id for the listing, a hotel id below it.
        .route("/hotels/:id", get(list_hotels))
        .route("/hotels/:id/price-history", get(price_history))
        .route("/hotels/:id/price-trends", get(price_trends))
        .route("/hotels/:id/hourly", get(hourly))
        .route("/cities/:city_id/stats", get(city_stats))
        .route("/alerts", post(create_alert).get(list_alerts))
        .route("/alerts/:id", delete(delete_alert))
        .route("/ws/prices/:city_id", get(city_stream))
        .route("/ws/hotels/:hotel_id", get(hotel_stream))
        .with_state(core)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}

async fn list_hotels(
    State(core): State<Arc<PriceFeedCore>>,
    Path(city_id): Path<String>,
) -> ApiResult<Json<Vec<HotelListing>>> {
    Ok(Json(core.hotels_in_city(&CityId::new(city_id))?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    from: Option<Timestamp>,
    to: Option<Timestamp>,
}

async fn price_history(
    State(core): State<Arc<PriceFeedCore>>,
    Path(hotel_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<PricePoint>>> {
    let points = core.price_history(&HotelId::new(hotel_id), query.from, query.to)?;
    Ok(Json(points))
}

async fn price_trends(
    State(core): State<Arc<PriceFeedCore>>,
    Path(hotel_id): Path<String>,
) -> ApiResult<Json<AggregateSnapshot>> {
    Ok(Json(core.price_trends(&HotelId::new(hotel_id))?))
}

#[derive(Debug, Deserialize)]
struct HourlyQuery {
    date: Option<NaiveDate>,
    start_hour: Option<u32>,
    count: Option<u32>,
}

async fn hourly(
    State(core): State<Arc<PriceFeedCore>>,
    Path(hotel_id): Path<String>,
    Query(query): Query<HourlyQuery>,
) -> ApiResult<Json<Vec<HourBucket>>> {
    let buckets = core.hour_buckets(&HotelId::new(hotel_id), query.date, query.start_hour, query.count)?;
    Ok(Json(buckets))
}

async fn city_stats(
    State(core): State<Arc<PriceFeedCore>>,
    Path(city_id): Path<String>,
) -> ApiResult<Json<CityStatistics>> {
    Ok(Json(core.city_statistics(&CityId::new(city_id))?))
}

async fn create_alert(
    State(core): State<Arc<PriceFeedCore>>,
    Json(req): Json<NewAlert>,
) -> ApiResult<(StatusCode, Json<PriceAlert>)> {
    let alert = core.alerts().create(req)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

#[derive(Debug, Deserialize)]
struct AlertQuery {
    email: String,
}

async fn list_alerts(
    State(core): State<Arc<PriceFeedCore>>,
    Query(query): Query<AlertQuery>,
) -> Json<Vec<PriceAlert>> {
    Json(core.alerts().list_for_email(&query.email))
}

async fn delete_alert(
    State(core): State<Arc<PriceFeedCore>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = AlertId::from_string(&id)
        .map_err(|e| Error::InvalidQuery(format!("alert id: {}", e)))?;
    core.alerts().deactivate(id)?;
    Ok(StatusCode::NO_CONTENT)
}
