pub mod agent;
pub mod config;
pub mod logging;
pub mod models;
pub mod process;
pub mod service;
pub mod uploader;
pub mod usage;
