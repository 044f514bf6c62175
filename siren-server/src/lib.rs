//! Siren Server Library - REST API components for the incident dispatch engine
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use config::Config;
pub use dispatch::{
    AlertDispatcher, DeliveryError, DispatchOutcome, HttpPushClient, MockPushDelivery,
    PushDelivery,
};
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::{create_router, create_router_with_config};
pub use state::AppState;
pub use store::{
    AlertEntry, AlertHistory, AnalysisRecord, Center, CenterRegistry, FingerprintStore,
    HashLocks, NewCenter, StoreError, Subscription,
};
