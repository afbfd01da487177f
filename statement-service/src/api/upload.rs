//! Batch upload endpoint.

use axum::{
    Json,
    extract::{Multipart, State},
};
use std::sync::Arc;
use tracing::debug;

use crate::error::{I18nError, ServiceError};
use crate::service::{IngestionSummary, UploadedFile};

use super::{AppState, RequestLocale};

/// Multipart field carrying the statement PDFs (repeated)
const FILES_FIELD: &str = "files";

/// Upload a batch of statement PDFs
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
    mut multipart: Multipart,
) -> Result<Json<IngestionSummary>, I18nError> {
    let mut files = Vec::new();

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            state.i18n_error(
                ServiceError::InvalidRequest {
                    message: e.body_text(),
                },
                &locale,
            )
        })?;
        let Some(field) = field else { break };

        if field.name() != Some(FILES_FIELD) {
            debug!(field = ?field.name(), "Ignoring multipart field");
            continue;
        }

        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        let content = field.bytes().await.map_err(|e| {
            state.i18n_error(
                ServiceError::InvalidRequest {
                    message: e.body_text(),
                },
                &locale,
            )
        })?;
        files.push(UploadedFile { filename, content });
    }

    let summary = state
        .service
        .ingest_batch(files)
        .await
        .map_err(|e| state.i18n_error(e, &locale))?;

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::super::testing::*;
    use crate::ingestion::testing::{BBVA_STATEMENT, SCOTIABANK_STATEMENT, fake_pdf};
    use crate::service::testing::{test_service, test_service_with};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_upload_reports_batch() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let first = fake_pdf(SCOTIABANK_STATEMENT);
        let second = fake_pdf(BBVA_STATEMENT);
        let response = send(
            &app,
            upload_request(&[("files", "enero.pdf", &first), ("files", "febrero.pdf", &second)]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["processed"], true);
        assert_eq!(json["document_count"], 2);
        assert_eq!(json["record_count"], 4);
        assert_eq!(json["documents"][0]["filename"], "enero.pdf");
        assert_eq!(json["documents"][1]["bank"], "BBVA");
        assert!(json["batch_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_upload_without_files() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let response = send(&app, upload_request(&[("note", "note.txt", b"hola")])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["details"]["reason"], "no_files");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (_dir, service) = test_service();
        let app = router(service.clone(), None);

        let good = fake_pdf(SCOTIABANK_STATEMENT);
        let response = send(
            &app,
            upload_request(&[("files", "enero.pdf", &good), ("files", "notas.pdf", b"plain text")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["details"]["reason"], "not_a_pdf");
        assert_eq!(json["details"]["filename"], "notas.pdf");
    }

    #[tokio::test]
    async fn test_upload_unrecognized_bank() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let unknown = fake_pdf("Banco Desconocido\n01/01/2024 algo 10.00");
        let response = send(&app, upload_request(&[("files", "raro.pdf", &unknown)])).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        assert_eq!(json["code"], "parse_error");
        assert_eq!(json["details"]["reason"], "unrecognized_bank");
    }

    #[tokio::test]
    async fn test_upload_too_many_files() {
        let (_dir, service) =
            test_service_with(|config| config.limits.max_files_per_batch = 1);
        let app = router(service, None);

        let pdf = fake_pdf(SCOTIABANK_STATEMENT);
        let response = send(
            &app,
            upload_request(&[("files", "a.pdf", &pdf), ("files", "b.pdf", &pdf)]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["details"]["reason"], "too_many_files");
    }
}
