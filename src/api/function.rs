use actix_web::{web, Resource};
use serde::Deserialize;

use crate::{error::Error, operation::Operation, service::Service};

use super::RotationResponse;

#[derive(Debug, Deserialize)]
pub struct FunctionRequest {
    pub service_account_email: Vec<String>,
    pub operation: Option<String>,
}

/// Single entry point for function-style deployments.
///
/// Unknown or missing operations are rejected before any backend is called.
async fn invoke(
    service: web::Data<Service>,
    data: web::Json<FunctionRequest>,
) -> Result<web::Json<RotationResponse>, Error> {
    let FunctionRequest {
        service_account_email,
        operation,
    } = data.into_inner();

    let operation = match operation {
        Some(operation) => Operation::parse(&operation)?,
        None => return Err(Error::missing_parameter("operation")),
    };

    super::dispatch(&service, &service_account_email, operation).await
}

pub fn service() -> Resource {
    web::resource("/").route(web::post().to(invoke))
}
