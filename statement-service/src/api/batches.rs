//! Batch inspection endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::StatementRecord;
use crate::error::{I18nError, ServiceError};
use crate::service::BatchDetails;

use super::{AppState, RequestLocale};

fn parse_batch_id(state: &AppState, raw: &str, locale: &str) -> Result<Uuid, I18nError> {
    Uuid::parse_str(raw).map_err(|_| {
        state.i18n_error(
            ServiceError::BatchNotFound {
                batch_id: raw.to_string(),
            },
            locale,
        )
    })
}

/// Get a batch with its documents
pub async fn get_batch_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchDetails>, I18nError> {
    let batch_id = parse_batch_id(&state, &batch_id, &locale)?;
    let details = state
        .service
        .get_batch_details(batch_id)
        .map_err(|e| state.i18n_error(e, &locale))?;
    Ok(Json(details))
}

/// Get all extracted records of a completed batch
pub async fn batch_records_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<StatementRecord>>, I18nError> {
    let batch_id = parse_batch_id(&state, &batch_id, &locale)?;
    let records = state
        .service
        .batch_records(batch_id)
        .map_err(|e| state.i18n_error(e, &locale))?;
    Ok(Json(records))
}
