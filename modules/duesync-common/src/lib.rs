pub mod config;
pub mod cookies;
pub mod error;

pub use config::Config;
pub use cookies::{normalize_cookies, CookieRecord};
pub use error::SyncError;
