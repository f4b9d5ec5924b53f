pub mod config;
pub mod logging;

pub mod archive;
pub mod fetch;
pub mod persist;
pub mod pipeline;
pub mod placeholder;
pub mod progress;
pub mod storage;
pub mod strategy;
pub mod url_model;
