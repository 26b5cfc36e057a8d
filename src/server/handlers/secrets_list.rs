use crate::{
    error::Error,
    server::{app_state::AppState, extractors::UserLogin},
};
use actix_web::{HttpResponse, web};

pub async fn secrets_list(
    state: web::Data<AppState>,
    user_login: UserLogin,
) -> Result<HttpResponse, Error> {
    let secrets = state.api.secrets().get_secrets(&user_login.0).await?;
    Ok(HttpResponse::Ok().json(secrets))
}
