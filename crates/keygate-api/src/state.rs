//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthService, PasswordConfig, SessionIssuer, TokenCodec};
use crate::metrics::Metrics;
use crate::photo::PhotoPipeline;
use keygate_core::config::AppConfig;
use keygate_core::{PhotoPublisher, TokenCache, UserDirectory};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Registration, login and token checks
    pub auth: AuthService,
    /// Verification photo pipeline
    pub photos: PhotoPipeline,
    /// Prometheus registry
    pub metrics: Metrics,
}

impl AppState {
    /// Wire the collaborators into the application state
    pub fn new(
        config: AppConfig,
        directory: Arc<dyn UserDirectory>,
        cache: Arc<dyn TokenCache>,
        codec: TokenCodec,
        password_config: PasswordConfig,
        publisher: Arc<dyn PhotoPublisher>,
    ) -> Result<Self, prometheus::Error> {
        let sessions = SessionIssuer::new(Arc::new(codec), cache, directory.clone());
        let auth = AuthService::new(directory, sessions, password_config);
        let photos = PhotoPipeline::new(&config.photo, publisher);

        Ok(Self {
            config,
            start_time: Instant::now(),
            is_ready: AtomicBool::new(true),
            auth,
            photos,
            metrics: Metrics::new()?,
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }
}
