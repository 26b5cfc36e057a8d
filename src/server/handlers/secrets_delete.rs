use crate::{
    error::Error,
    server::{app_state::AppState, extractors::UserLogin},
};
use actix_web::{HttpResponse, web};

pub async fn secrets_delete(
    state: web::Data<AppState>,
    user_login: UserLogin,
    path_params: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let id = path_params.into_inner();
    state
        .api
        .secrets()
        .delete_secret(&user_login.0, &id)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
