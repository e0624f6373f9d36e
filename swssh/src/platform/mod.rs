//! Vendor profiles for multi-vendor support.
//!
//! This module defines the per-vendor command dialect (pagination, save,
//! logout, layer-2 discovery) and the rules for reading vendor and model out
//! of version output. Adding a vendor means adding a profile; the session
//! automaton never branches on vendor ids.

mod definition;
mod registry;
pub mod uplink;
pub mod vendors;

pub use definition::VendorProfile;
pub use registry::{UNKNOWN_VENDOR, VendorRegistry};
