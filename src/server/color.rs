//! Public color endpoint
//!
//! `GET /next` asks the random service for three bytes and renders them as
//! an RGB color.

use crate::random::RandomQuery;
use crate::server::context::ServiceContext;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Values requested from the random service for one color
const COLOR_QUERY: RandomQuery = RandomQuery {
    min: 0,
    max: 255,
    count: 3,
};

pub const WRONG_COUNT_MESSAGE: &str =
    "Invalid response from random service: wrong number of random numbers received.";

pub const OUT_OF_RANGE_MESSAGE: &str =
    "Invalid response from random service: value out of range.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorResponse {
    pub hex: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorResponse {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            hex: format!("#{:02x}{:02x}{:02x}", r, g, b),
            r,
            g,
            b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Serialize `body` as JSON with `status`
///
/// Serialization failures become a 500 carrying the serializer's message.
pub fn render_json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(encoded) => (status, [(CONTENT_TYPE, "application/json")], encoded).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Turn the random service's values into a color, or the client-facing
/// error message explaining why that is not possible
fn color_from_values(values: &[i64]) -> Result<ColorResponse, &'static str> {
    let [r, g, b] = values else {
        warn!(
            expected = COLOR_QUERY.count,
            received = values.len(),
            "Random service returned invalid data: wrong number of random numbers"
        );
        return Err(WRONG_COUNT_MESSAGE);
    };

    let to_byte = |v: i64| u8::try_from(v).ok();
    match (to_byte(*r), to_byte(*g), to_byte(*b)) {
        (Some(r), Some(g), Some(b)) => Ok(ColorResponse::from_rgb(r, g, b)),
        _ => {
            warn!(values = ?values, "Random service returned values outside 0..=255");
            Err(OUT_OF_RANGE_MESSAGE)
        }
    }
}

/// `GET /next` handler
pub async fn next_color(State(ctx): State<Arc<ServiceContext>>) -> Response {
    let response = match ctx.random.next(COLOR_QUERY).await {
        Err(e) => render_json(StatusCode::BAD_REQUEST, &ErrorResponse::new(e.to_string())),
        Ok(values) => match color_from_values(&values) {
            Ok(color) => render_json(StatusCode::OK, &color),
            Err(msg) => render_json(StatusCode::BAD_REQUEST, &ErrorResponse::new(msg)),
        },
    };

    ctx.metrics.record_request(response.status().as_u16());
    response
}

/// Build the router for the public listener
pub fn build_public_router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/next", get(next_color))
        .with_state(ctx)
}
