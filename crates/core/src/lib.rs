pub mod agg;
pub mod config;
pub mod error;
pub mod model;
pub mod series;
pub mod time;

pub use error::{Result, TallyError};
