// Core module definitions for Exliar Compat

pub mod probe;
pub mod readiness;
pub mod system;
pub mod vfio;
