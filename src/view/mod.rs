pub mod chart;
pub mod pagination;

pub use chart::*;
pub use pagination::*;
