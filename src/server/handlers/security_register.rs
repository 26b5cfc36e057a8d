use crate::{error::Error, server::app_state::AppState, users::AuthRequest};
use actix_web::{HttpResponse, web};

pub async fn security_register(
    state: web::Data<AppState>,
    body_params: web::Json<AuthRequest>,
) -> Result<HttpResponse, Error> {
    let body_params = body_params.into_inner();
    state
        .api
        .security()
        .register(&body_params.login, &body_params.password)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
