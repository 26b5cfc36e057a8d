use crate::{api::Api, config::Config};

pub struct AppState {
    pub config: Config,
    pub api: Api,
}

impl AppState {
    pub fn new(config: Config, api: Api) -> Self {
        Self { config, api }
    }
}
