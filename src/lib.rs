pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod pricing;
pub mod rbac;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod validation;
