pub mod profile;
pub mod query;
pub mod table;

pub use profile::*;
pub use query::*;
pub use table::*;
