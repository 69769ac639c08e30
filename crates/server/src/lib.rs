//! Case outcome prediction service
//!
//! HTTP front end over `predictor_lib`: configuration and the axum router.

pub mod api;
pub mod config;
