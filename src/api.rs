//! HTTP trigger adapters.
//!
//! Both adapters decode a request, parse the service accounts and hand off
//! to [`Service::dispatch`]:
//! - [`rotation`] exposes one route per operation (`/create`, `/delete`, `/all`)
//! - [`function`] exposes a single entry point selected by an `operation` field

use actix_web::{
    web::{self, Json, JsonConfig},
    HttpRequest,
};
use serde::Serialize;

use crate::{
    error::Error,
    identity::ServiceAccount,
    operation::Operation,
    service::{AccountReport, Service},
};

pub mod function;
pub mod rotation;

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub message: &'static str,
    pub results: Vec<AccountReport>,
}

/// JSON extractor config: bodies are accepted without a content type and
/// decoding failures are reported as [`Error::InvalidParameter`].
pub fn json_config() -> JsonConfig {
    JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req: &HttpRequest| Error::invalid_parameter(err.to_string()).into())
}

/// Registers both adapters and the JSON config on an app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(function::service())
        .service(rotation::service());
}

async fn dispatch(
    service: &Service,
    emails: &[String],
    operation: Operation,
) -> Result<Json<RotationResponse>, Error> {
    let result = match ServiceAccount::parse_all(emails) {
        Ok(accounts) => service.dispatch(&accounts, operation).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(results) => Ok(Json(RotationResponse {
            message: operation.success_message(),
            results,
        })),
        Err(e) => {
            tracing::error!(error = %e, %operation, "Rotation failed");
            Err(e)
        }
    }
}
