mod app_state;
mod extractors;
mod handlers;

use crate::{
    api::Api,
    config::Config,
    security::verify_token,
    server::{app_state::AppState, extractors::UserLogin},
    storage::{DatabaseStorage, MemoryStorage, Storage},
};
use actix_web::{App, HttpMessage, HttpServer, dev::ServiceRequest, middleware, web};
use actix_web_httpauth::{extractors::bearer::BearerAuth, middleware::HttpAuthentication};
use anyhow::bail;
use std::sync::Arc;
use tracing::{info, warn};

/// Validates the bearer token and injects the authenticated login into the
/// request extensions, where data route handlers pick it up.
async fn validate_bearer_token(
    request: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let Some(state) = request.app_data::<web::Data<AppState>>() else {
        return Err((
            actix_web::error::ErrorInternalServerError("Internal Server Error"),
            request,
        ));
    };

    match verify_token(&state.config.security.jwt_secret, credentials.token()) {
        Ok(claims) => {
            request.extensions_mut().insert(UserLogin(claims.sub));
            Ok(request)
        }
        Err(err) => {
            warn!("Failed to verify bearer token: {err:?}");
            Err((
                actix_web::error::ErrorUnauthorized("Unauthorized"),
                request,
            ))
        }
    }
}

/// Registers the API routes. Data routes sit behind the bearer token
/// middleware; registration and login are open.
pub fn configure_api(config: &mut web::ServiceConfig) {
    config.service(
        web::scope("/api")
            .service(
                web::scope("/user")
                    .route("/register", web::post().to(handlers::security_register))
                    .route("/login", web::post().to(handlers::security_login)),
            )
            .service(
                web::scope("/secrets")
                    .wrap(HttpAuthentication::bearer(validate_bearer_token))
                    .route("", web::get().to(handlers::secrets_list))
                    .route("", web::post().to(handlers::secrets_add))
                    .route("/sync", web::post().to(handlers::secrets_sync))
                    .route("/{id}", web::delete().to(handlers::secrets_delete)),
            ),
    );
}

#[actix_web::main]
pub async fn run(config: Config) -> Result<(), anyhow::Error> {
    if config.security.jwt_secret.is_empty() {
        bail!("`security.jwt_secret` must be set before the server can start.");
    }

    let storage: Arc<dyn Storage> = match &config.db.path {
        Some(path) => {
            info!(path = %path.display(), "Using the durable database backend.");
            Arc::new(DatabaseStorage::open(path, &config.db).await?)
        }
        None => {
            warn!(
                "Database path is not set, using the in-memory backend. \
                 Data will be lost on restart!"
            );
            Arc::new(MemoryStorage::new())
        }
    };

    let api = Api::new(config.clone(), storage.clone());
    let state = web::Data::new(AppState::new(config.clone(), api));

    let http_server_url = format!("0.0.0.0:{}", config.http_port);
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(state.clone())
            .configure(configure_api)
    })
    .bind(&http_server_url)?;

    info!("Covault API server v{} is available at {http_server_url}.", config.version);
    http_server.run().await?;

    storage.close().await?;
    Ok(())
}
