//! Artifact generation endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{I18nError, ServiceError};
use crate::export::OutputFormat;
use crate::service::GeneratedArtifact;

use super::{AppState, RequestLocale};

/// Generate query parameters
#[derive(Deserialize)]
pub struct GenerateParams {
    pub batch_id: Option<String>,
    pub file_type: Option<String>,
}

/// Generate (or return the existing) artifact for a batch
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
    Query(params): Query<GenerateParams>,
) -> Result<Json<GeneratedArtifact>, I18nError> {
    let format = OutputFormat::parse(params.file_type.as_deref().unwrap_or("excel"))
        .map_err(|e| state.i18n_error(e, &locale))?;

    let raw_id = params.batch_id.ok_or_else(|| {
        state.i18n_error(
            ServiceError::InvalidRequest {
                message: "batch_id is required".to_string(),
            },
            &locale,
        )
    })?;
    // A malformed id cannot name a batch
    let batch_id = Uuid::parse_str(raw_id.trim()).map_err(|_| {
        state.i18n_error(ServiceError::BatchNotFound { batch_id: raw_id.clone() }, &locale)
    })?;

    let artifact = state
        .service
        .generate_artifact(batch_id, format)
        .await
        .map_err(|e| state.i18n_error(e, &locale))?;

    Ok(Json(artifact))
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::super::testing::*;
    use crate::ingestion::testing::{SCOTIABANK_STATEMENT, fake_pdf};
    use crate::service::UploadedFile;
    use crate::service::testing::test_service;
    use axum::Router;
    use axum::http::StatusCode;
    use bytes::Bytes;
    use uuid::Uuid;

    async fn upload_one(app: &Router) -> String {
        let pdf = fake_pdf(SCOTIABANK_STATEMENT);
        let response = send(app, upload_request(&[("files", "enero.pdf", &pdf)])).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["batch_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_generate_defaults_to_excel() {
        let (_dir, service) = test_service();
        let app = router(service, None);
        let batch_id = upload_one(&app).await;

        let response = fetch(&app, &format!("/generate?batch_id={}", batch_id)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["file_type"], "excel");
        assert_eq!(json["batch_id"], batch_id.as_str());
        assert_eq!(
            json["file_path"],
            format!("artifacts/{}/movimientos_combinados.xlsx", batch_id)
        );
        assert_eq!(json["sha256"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_generate_accepts_any_case() {
        let (_dir, service) = test_service();
        let app = router(service, None);
        let batch_id = upload_one(&app).await;

        let response = fetch(&app, &format!("/generate?batch_id={}&file_type=TXT", batch_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["file_type"], "txt");
    }

    #[tokio::test]
    async fn test_invalid_format_is_distinct_from_missing_batch() {
        let (_dir, service) = test_service();
        let app = router(service, None);
        let batch_id = upload_one(&app).await;

        let response = fetch(&app, &format!("/generate?batch_id={}&file_type=pdf", batch_id)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "invalid_format");
        assert_eq!(json["details"]["file_type"], "pdf");

        let response = fetch(
            &app,
            "/generate?batch_id=7f1c0c1e-9d5c-4a8e-b0a1-3f5f0e6b2c11&file_type=csv",
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "not_found");

        let response = fetch(&app, "/generate?batch_id=not-a-uuid&file_type=csv").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_requires_batch_id() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let response = fetch(&app, "/generate?file_type=csv").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_failed_batch_is_not_found() {
        let (_dir, service) = test_service();
        let app = router(service.clone(), None);

        let batch_id = Uuid::new_v4();
        let _ = service
            .ingest_with_id(
                batch_id,
                vec![UploadedFile {
                    filename: "x.pdf".to_string(),
                    content: Bytes::from_static(b"nope"),
                }],
            )
            .await;

        let response = fetch(&app, &format!("/generate?batch_id={}&file_type=csv", batch_id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["details"]["reason"], "incomplete");
        assert_eq!(json["details"]["status"], "failed");
    }
}
