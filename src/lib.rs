pub mod capacity;
pub mod config;
pub mod data_models;
pub mod errors;
pub mod extractor;
pub mod fetcher;
pub mod paginator;
