pub mod delivery;
pub mod metrics;
pub mod router;
pub mod session_registry;
