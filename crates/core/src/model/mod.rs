pub mod metric;
pub mod point;
