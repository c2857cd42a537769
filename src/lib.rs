pub mod admission;
pub mod batch;
pub mod browser_pool;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod scrape;
pub mod shutdown;
pub mod store;
pub mod webhook;

pub use browser_pool::{BrowserPool, BrowserPoolConfig, PooledBrowserGuard};
pub use browser_profile::{
    BrowserProfile, cleanup_stale_lock, cleanup_stale_profiles, create_unique_profile,
    create_unique_profile_with_prefix, is_singleton_lock_stale,
};
pub use browser_setup::{apply_stealth_measures, download_managed_browser, find_browser_executable, launch_browser};
pub use config::ServerConfig;
pub use error::{AppError, AppResult};
