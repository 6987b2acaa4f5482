use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::error::AppError;

/// `axum::Json` whose rejections are reported as `AppError::Validation`.
///
/// Malformed bodies, wrong field types and a missing JSON content type all
/// answer 400 with the usual `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::IntoResponse,
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        code: uuid::Uuid,
    }

    async fn extract(content_type: &str, body: &'static str) -> Result<ValidJson<Payload>, AppError> {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        ValidJson::<Payload>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn rejections_become_validation_errors() {
        for (content_type, body) in [
            ("application/json", r#"{"code":"not-a-uuid"}"#),
            ("application/json", r#"{"code":"#),
            ("application/json", r#"{}"#),
            ("text/plain", r#"{"code":"1b4e28ba-2fa1-11d2-883f-0016d3cca427"}"#),
        ] {
            let Err(error) = extract(content_type, body).await else {
                panic!("{body} should be rejected");
            };
            assert!(matches!(error, AppError::Validation(_)));
            assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn accepts_a_well_formed_body() {
        let extracted = extract(
            "application/json",
            r#"{"code":"1b4e28ba-2fa1-11d2-883f-0016d3cca427"}"#,
        )
        .await;
        assert!(extracted.is_ok());
    }
}
