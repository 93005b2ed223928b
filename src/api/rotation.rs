use actix_web::{post, web, Scope};
use serde::Deserialize;

use crate::{error::Error, operation::Operation, service::Service};

use super::RotationResponse;

#[derive(Debug, Deserialize)]
pub struct RotationRequest {
    pub service_account_email: Vec<String>,
}

#[post("/create")]
async fn create_keys(
    service: web::Data<Service>,
    data: web::Json<RotationRequest>,
) -> Result<web::Json<RotationResponse>, Error> {
    super::dispatch(&service, &data.service_account_email, Operation::Create).await
}

#[post("/delete")]
async fn delete_keys(
    service: web::Data<Service>,
    data: web::Json<RotationRequest>,
) -> Result<web::Json<RotationResponse>, Error> {
    super::dispatch(&service, &data.service_account_email, Operation::Delete).await
}

#[post("/all")]
async fn rotate_keys(
    service: web::Data<Service>,
    data: web::Json<RotationRequest>,
) -> Result<web::Json<RotationResponse>, Error> {
    super::dispatch(&service, &data.service_account_email, Operation::All).await
}

pub fn service() -> Scope {
    web::scope("")
        .service(create_keys)
        .service(delete_keys)
        .service(rotate_keys)
}
