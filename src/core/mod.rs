pub mod config;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod platform;
pub mod presence;
pub mod reader;
pub mod service;
pub mod utils;
pub mod worker;
