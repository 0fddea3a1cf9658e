pub mod auth;
pub mod engine;
pub mod session;
pub mod translator;

pub use auth::*;
pub use engine::*;
pub use session::*;
pub use translator::*;
