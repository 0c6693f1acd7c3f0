//! Ambient engineering shared by every other module: error taxonomy, string
//! interning, configuration, and the collaborator traits the core is built
//! against but does not itself implement.

pub mod cancel;
pub mod config;
pub mod errors;
pub mod interning;
pub mod io_traits;
pub mod rng;
