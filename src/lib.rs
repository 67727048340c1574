pub mod app;
pub mod config;
pub mod map;
pub mod shops;
