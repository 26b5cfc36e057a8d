use crate::{
    error::Error,
    secrets::SyncRequest,
    server::{app_state::AppState, extractors::UserLogin},
};
use actix_web::{HttpResponse, web};
use std::time::Duration;

/// Sync pushes run under a fixed deadline so a stuck backend cannot hold a
/// client connection indefinitely.
const SYNC_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn secrets_sync(
    state: web::Data<AppState>,
    user_login: UserLogin,
    body_params: web::Json<SyncRequest>,
) -> Result<HttpResponse, Error> {
    let secrets = body_params.into_inner().secrets;
    tokio::time::timeout(
        SYNC_TIMEOUT,
        state.api.secrets().save_secrets(&user_login.0, secrets),
    )
    .await
    .map_err(|_| Error::deadline_exceeded())??;

    Ok(HttpResponse::Ok().finish())
}
