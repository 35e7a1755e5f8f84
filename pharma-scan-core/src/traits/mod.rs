pub mod camera_provider;
pub mod render_surface;
pub mod scan_delegate;
pub mod symbol_decoder;
