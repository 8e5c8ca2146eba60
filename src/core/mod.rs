pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod extensions;
pub mod history;
pub mod message;
pub mod persona;
