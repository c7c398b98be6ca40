pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod media;
pub mod middleware;
pub mod models;
pub mod session;
pub mod upload;
