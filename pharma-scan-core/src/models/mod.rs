pub mod bitmap;
pub mod config;
pub mod error;
pub mod outcome;
pub mod state;
pub mod symbology;
