pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod view;

pub use models::*;
pub use services::*;
pub use view::*;
