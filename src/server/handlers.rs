mod secrets_add;
mod secrets_delete;
mod secrets_list;
mod secrets_sync;
mod security_login;
mod security_register;

pub use self::{
    secrets_add::secrets_add, secrets_delete::secrets_delete, secrets_list::secrets_list,
    secrets_sync::secrets_sync, security_login::security_login,
    security_register::security_register,
};
