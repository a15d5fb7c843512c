pub mod error;
pub mod properties;
pub mod service;
