use crate::core::dates;
use crate::core::types::*;
use crate::core::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::{error, info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);

pub const INDIAN_STATES: &[&str] = &[
    "Andaman and Nicobar",
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chandigarh",
    "Chhattisgarh",
    "Delhi",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Ladakh",
    "Lakshadweep",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Puducherry",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttarakhand",
    "Uttar Pradesh",
    "West Bengal",
];

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn unavailable(e: crate::core::ScraperError) -> ApiError {
    error!("scraper session unavailable: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Scraper is unavailable")
}

/// Unwrap a JSON body, turning axum's plain-text rejection into an `{error}` 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        warn!("web: rejected request body: {}", rejection.body_text());
        api_error(StatusCode::BAD_REQUEST, "Invalid JSON body")
    })
}

/// Trimmed, non-empty value of an optional field.
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ecourts-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_states() -> Json<Vec<&'static str>> {
    Json(INDIAN_STATES.to_vec())
}

pub async fn search_cnr(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchCnrRequest>, JsonRejection>,
) -> Result<Json<DataResponse<CaseRecord>>, ApiError> {
    let request = json_body(payload)?;
    let Some(cnr) = required(&request.cnr) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "CNR number is required"));
    };
    info!("web: search_cnr {}", cnr);

    match state.service.search_by_cnr(cnr).await.map_err(unavailable)? {
        Some(data) => Ok(Json(DataResponse {
            success: true,
            data,
        })),
        None => Err(api_error(StatusCode::NOT_FOUND, "Case not found")),
    }
}

pub async fn check_listing(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckListingRequest>, JsonRejection>,
) -> Result<Json<DataResponse<ListingCheck>>, ApiError> {
    let request = json_body(payload)?;
    let Some(cnr) = required(&request.cnr) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "CNR number is required"));
    };
    let date = match required(&request.check_type)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        None | Some("today") => dates::today(),
        Some("tomorrow") => dates::tomorrow(),
        Some(other) => {
            warn!("web: check_listing with unknown type '{}'", other);
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "type must be 'today' or 'tomorrow'",
            ));
        }
    };
    info!("web: check_listing {} on {}", cnr, date);

    match state.service.check_listing(cnr, &date).await.map_err(unavailable)? {
        Some(data) => Ok(Json(DataResponse {
            success: true,
            data,
        })),
        None => Err(api_error(StatusCode::NOT_FOUND, "Could not check listing")),
    }
}

pub async fn download_causelist(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadCauseListRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let request = json_body(payload)?;
    let (Some(st), Some(district), Some(complex)) = (
        required(&request.state),
        required(&request.district),
        required(&request.court_complex),
    ) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "State, district, and court complex are required",
        ));
    };
    let list_type = match required(&request.list_type) {
        None => ListType::default(),
        Some(raw) => raw
            .parse::<ListType>()
            .map_err(|_| api_error(StatusCode::BAD_REQUEST, "list_type must be Civil or Criminal"))?,
    };

    let cause_request = CauseListRequest {
        state: st.to_string(),
        district: district.to_string(),
        court_complex: complex.to_string(),
        court_name: required(&request.court_name).map(str::to_string),
        date: Some(
            required(&request.date)
                .map(dates::format_date)
                .unwrap_or_else(dates::today),
        ),
        list_type,
    };
    info!(
        "web: download_causelist {}/{}/{}",
        cause_request.state, cause_request.district, cause_request.court_complex
    );

    match state
        .service
        .download_cause_list(&cause_request)
        .await
        .map_err(unavailable)?
    {
        Some(outcome) => Ok(Json(DownloadResponse {
            success: true,
            message: "Cause list downloaded successfully".to_string(),
            file: outcome.path().display().to_string(),
        })),
        None => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to download cause list",
        )),
    }
}
