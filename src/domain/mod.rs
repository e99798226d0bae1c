pub mod indicators;
pub mod market;

pub use market::*;
