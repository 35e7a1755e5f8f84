pub mod acquisition;
pub mod controller;
pub mod decode_source;
pub mod resource_handle;
