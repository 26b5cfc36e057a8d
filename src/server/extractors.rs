use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use std::future::{Ready, ready};

/// Authenticated user login, injected into request extensions by the bearer
/// token middleware. Extraction fails with 401 when a data route is somehow
/// reached without passing authentication.
#[derive(Debug, Clone)]
pub struct UserLogin(pub String);

impl FromRequest for UserLogin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            request
                .extensions()
                .get::<UserLogin>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Unauthorized")),
        )
    }
}
