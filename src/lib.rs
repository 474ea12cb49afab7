pub mod config;
pub mod handlers;
pub mod models;
pub mod services;

use std::time::Instant;

use services::{router::Router, session_registry::SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub start_time: Instant,
    pub sessions: SessionRegistry,
    pub router: Router,
}

impl AppState {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self {
            start_time: Instant::now(),
            router: Router::new(sessions.clone()),
            sessions,
        }
    }
}
