use crate::{error::Error, server::app_state::AppState, users::AuthRequest};
use actix_web::{HttpResponse, web};
use serde_json::json;

pub async fn security_login(
    state: web::Data<AppState>,
    body_params: web::Json<AuthRequest>,
) -> Result<HttpResponse, Error> {
    let body_params = body_params.into_inner();
    let token = state
        .api
        .security()
        .signin(&body_params.login, &body_params.password)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}
