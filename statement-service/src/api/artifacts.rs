//! Artifact download endpoint.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{HeaderValue, header},
    response::Response,
};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use uuid::Uuid;

use crate::error::{I18nError, ServiceError};
use crate::export::artifact_relative_path;

use super::{AppState, RequestLocale};

/// Serve a generated artifact as an attachment
pub async fn artifact_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
    Path((batch_id, file_name)): Path<(String, String)>,
    request: Request,
) -> Result<Response, I18nError> {
    let batch_id = Uuid::parse_str(&batch_id).map_err(|_| {
        state.i18n_error(
            ServiceError::ArtifactNotFound {
                path: format!("{}/{}", batch_id, file_name),
            },
            &locale,
        )
    })?;

    let artifact = state
        .service
        .locate_artifact(batch_id, &file_name)
        .await
        .map_err(|e| state.i18n_error(e, &locale))?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.file_name
    ))
    .map_err(|e| {
        state.i18n_error(
            ServiceError::Internal {
                message: format!(
                    "Invalid artifact name {}: {}",
                    artifact_relative_path(batch_id, &artifact.file_name),
                    e
                ),
            },
            &locale,
        )
    })?;

    let response = ServeFile::new_with_mime(&artifact.path, &artifact.format.content_type())
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});

    let mut response = response.map(Body::new);
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::super::router;
    use super::super::testing::*;
    use crate::export::HEADERS;
    use crate::ingestion::testing::{BBVA_STATEMENT, SCOTIABANK_STATEMENT, fake_pdf};
    use crate::service::testing::test_service;
    use axum::Router;
    use axum::http::{StatusCode, header};
    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    async fn upload_and_generate(app: &Router, file_type: &str) -> String {
        let first = fake_pdf(SCOTIABANK_STATEMENT);
        let second = fake_pdf(BBVA_STATEMENT);
        let response = send(
            app,
            upload_request(&[("files", "enero.pdf", &first), ("files", "febrero.pdf", &second)]),
        )
        .await;
        let batch_id = body_json(response).await["batch_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = fetch(
            app,
            &format!("/generate?batch_id={}&file_type={}", batch_id, file_type),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["file_path"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_upload_generate_download_excel() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let path = upload_and_generate(&app, "excel").await;
        let response = fetch(&app, &format!("/{}", path)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"movimientos_combinados.xlsx\""
        );

        let bytes = body_bytes(response).await;
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), ["enero", "febrero"]);

        let enero = workbook.worksheet_range("enero").unwrap();
        let header: Vec<String> = enero
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|cell| cell.to_string())
            .collect();
        assert_eq!(header, HEADERS);
        assert_eq!(enero.height(), 3);

        let febrero = workbook.worksheet_range("febrero").unwrap();
        let oxxo = febrero
            .rows()
            .find(|row| row[4] == Data::String("PAGO TARJETA OXXO".to_string()))
            .unwrap();
        assert_eq!(oxxo[0], Data::String("05/02/2024".to_string()));
        assert_eq!(oxxo[1], Data::String("N/A".to_string()));
        assert_eq!(oxxo[2], Data::Float(0.0));
        assert_eq!(oxxo[3], Data::Float(300.5));
        assert_eq!(oxxo[5], Data::Float(10949.5));
    }

    #[tokio::test]
    async fn test_csv_download_is_idempotent() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let path = upload_and_generate(&app, "csv").await;
        let first = body_bytes(fetch(&app, &format!("/{}", path)).await).await;

        let batch_id = path.split('/').nth(1).unwrap();
        let response = fetch(&app, &format!("/generate?batch_id={}&file_type=csv", batch_id)).await;
        let again = body_json(response).await["file_path"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(again, path);

        let second = body_bytes(fetch(&app, &format!("/{}", again)).await).await;
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("fecha,referencia,deposito,retiro,descripcion,saldo_operacion"));
        assert!(text.contains("PAGO TARJETA OXXO"));
    }

    #[tokio::test]
    async fn test_unknown_artifacts_are_not_found() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let path = upload_and_generate(&app, "csv").await;
        let batch_id = path.split('/').nth(1).unwrap();

        // Recorded batch, but this format was never generated
        let response = fetch(
            &app,
            &format!("/artifacts/{}/movimientos_combinados.xlsx", batch_id),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "not_found");

        let response = fetch(&app, "/artifacts/not-a-uuid/movimientos_combinados.csv").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = fetch(&app, &format!("/artifacts/{}/statements.db", batch_id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
