//! Core of a meeting-room reservation system: a conflict-resolving booking
//! engine with a JSON snapshot store, plus token-based authentication and a
//! static role capability matrix. Transport (HTTP routing, cookies,
//! rendering) is the embedding application's concern; it talks to
//! [`service::Service`] and maps [`service::ServiceError`] onto status codes.

pub mod auth;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod policy;
pub mod service;
