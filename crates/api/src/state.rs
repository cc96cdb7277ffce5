use services::AppServices;

/// Shared handler state; `AppServices` is a bundle of `Arc`s so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}
