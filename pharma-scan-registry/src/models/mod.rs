pub mod error;
pub mod product;
pub mod serial;
