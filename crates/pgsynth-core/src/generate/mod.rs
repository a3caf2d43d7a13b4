pub mod engine;
pub mod pool;
pub mod providers;
pub mod sampler;
pub mod value;
