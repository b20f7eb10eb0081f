pub mod audio;
pub mod constants;
pub mod engine;
pub mod maze;
pub mod placement;
pub mod profile_store;
pub mod rng;
pub mod runner;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
