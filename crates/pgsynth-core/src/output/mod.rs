pub mod direct;
pub mod sink;
