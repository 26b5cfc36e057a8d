mod user;

pub use self::user::User;

use serde_derive::Deserialize;

/// Login/password pair submitted by clients to register or sign in.
#[derive(Deserialize, Debug, Clone)]
pub struct AuthRequest {
    pub login: String,
    pub password: String,
}
