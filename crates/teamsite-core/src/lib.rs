//! Core teamsite library (session, API client, storage, config).

pub mod api;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod session;
pub mod storage;
pub mod validation;
