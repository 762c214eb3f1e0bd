use marea_catalog::CaptainDirectory;
use marea_dispatch::{LiveRideDispatcher, NotificationStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<LiveRideDispatcher>,
    pub captains: Arc<dyn CaptainDirectory>,
    pub notifications: Arc<dyn NotificationStore>,
    pub auth: AuthConfig,
}
