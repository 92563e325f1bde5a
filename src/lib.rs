// SocialHub - social network backend over a JSON document store

// Core types and primitives
pub mod core;

// Persistence - document store interface and SQLite implementation
pub mod store;

// Document models - accounts, friend records, posts, comments
pub mod models;

// Business logic - friendship protocol and engagement services
pub mod services;

// HTTP surface - router, handlers, viewer identity
pub mod http;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
