pub mod cache;
pub mod config;
pub mod logging;
pub mod model;
pub mod tsh;
pub mod ui;
pub mod wizard;
