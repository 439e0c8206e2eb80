pub mod assembler;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod keys;
pub mod metrics_consts;
pub mod proto;
pub mod refs;
pub mod retriever;
pub mod serving;
pub mod specs;
pub mod store;
pub mod types;

// Shared with the integration tests under tests/, so it is compiled into the library.
pub mod test_utils;
