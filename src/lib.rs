//! Local share-automation dashboard host: account signup and login over a
//! key-value store, a single current-session pointer, and a polled
//! statistics feed.

pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod storage {
    pub mod file;
    pub mod kv;
    pub mod memory;
}

pub mod models {
    pub mod account;
    pub mod session;
}

pub mod repositories {
    pub mod account;
    pub mod session;
}

pub mod services {
    pub mod auth;
    pub mod statistics;
}

pub mod handlers {
    pub mod auth;
    pub mod dashboard;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

pub use config::Config;
pub use error::{AppError, Result};
pub use services::auth::{AuthContext, AuthService, DefaultAccount};
pub use state::AppState;
