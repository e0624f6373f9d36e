//! Built-in vendor profiles.

pub mod cisco;
pub mod cisco_nexus;
pub mod h3c;
pub mod huawei;
