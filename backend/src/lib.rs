// --- File: backend/src/lib.rs ---

// Entry point for the `quiz_backend` library. The binary in main.rs and the
// integration tests both build the server from these modules.
pub mod api_doc;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod questions;
pub mod quiz;
pub mod web_server;
