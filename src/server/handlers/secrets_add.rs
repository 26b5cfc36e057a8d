use crate::{
    error::Error,
    secrets::Secret,
    server::{app_state::AppState, extractors::UserLogin},
};
use actix_web::{HttpResponse, web};

pub async fn secrets_add(
    state: web::Data<AppState>,
    user_login: UserLogin,
    body_params: web::Json<Secret>,
) -> Result<HttpResponse, Error> {
    state
        .api
        .secrets()
        .add_secret(&user_login.0, body_params.into_inner())
        .await?;

    Ok(HttpResponse::Ok().finish())
}
