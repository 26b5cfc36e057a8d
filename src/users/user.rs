/// Registered vault account. Login is unique and immutable, the password hash
/// is an opaque string minted by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub password_hash: String,
}
