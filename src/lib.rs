mod app;
mod config;
mod error;
mod handlers;
mod models;
mod utils;

pub use app::App;
pub use error::Error;
