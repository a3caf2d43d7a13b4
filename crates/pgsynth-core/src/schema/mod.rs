pub mod array;
pub mod clone;
pub mod introspect;
pub mod postgres;
pub mod profile;
pub mod types;
