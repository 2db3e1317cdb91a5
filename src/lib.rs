// Photomark watermark composition library

pub mod config;
pub mod logging;
pub mod watermark;
