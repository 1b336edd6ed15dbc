pub mod batch;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod output;
pub mod source;
