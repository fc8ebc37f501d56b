use crate::config::settings::AppConfig;
use crate::modules::convert::service::ConversionService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub converter: ConversionService,
}

impl AppState {
    pub fn new(config: AppConfig, converter: ConversionService) -> Self {
        Self { config, converter }
    }
}
