// Application layer - Polling and synchronization core
pub mod aggregator;
pub mod auth_service;
pub mod backend_api;
pub mod bounded_fetch;
pub mod command_gate;
pub mod confirmation;
pub mod controller;
pub mod error;
pub mod session;
pub mod subscription;
pub mod transport;

#[cfg(test)]
pub mod testing;
