//! Huawei VRP profile.
//!
//! The save sequence answers the `Are you sure to continue?[Y/N]` question
//! that follows `save`.
//!
//! # Version Probe Example
//!
//! ```text
//! <BJ_XX_305-A-15_CE5810>display version | in (Huawei|H3C).*(Software|uptime)
//! Huawei Versatile Routing Platform Software
//! Huawei CE5810-48T4S-EI uptime is 120 days, 2 hours, 10 minutes
//! ```
//!
//! # MAC Table Row
//!
//! ```text
//! 0000-5e00-0101 100/-/-                           GE1/0/48            dynamic
//! ```

use crate::platform::VendorProfile;

/// Create the Huawei profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new("huawei")
        .with_signature("Huawei ")
        .with_paging_command("screen-length 0 temp")
        .with_save_command("return\rsave\r\\y\r")
        .with_logout_command("quit\rquit\r")
        .with_l2_commands(
            "display ip routing-table 0.0.0.0 0",
            "disp arp dynamic | include {ip}",
            "display mac-address {mac}",
        )
        .with_uplink_column(1)
        .with_model_pattern(r"^huawei.*uptime", r" *uptime.*$")
        .expect("huawei model pattern must compile")
}
