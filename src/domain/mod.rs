// Domain layer - Plain data shared by the polling core and its adapters
pub mod command;
pub mod sample;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod stats;
pub mod status;
pub mod view;
