// Exliar Compat
//
// macOS GPU compatibility classification and KVM/VFIO/USB passthrough
// readiness checks for the Exliar virtualization toolkit

// Configuration and error types
pub mod config;
pub mod error;

// Host probing, readiness scoring and VFIO helpers
pub mod core;

// GPU detection and compatibility classification
pub mod gpu;

// USB passthrough selection and boot script editing
pub mod usb;

// User interface
pub mod ui;

// Utility functions
pub mod utils;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
