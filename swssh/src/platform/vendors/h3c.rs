//! H3C Comware profile.
//!
//! # Version Probe Example
//!
//! ```text
//! <BJ_XX_311_F-12-13_LVS_S5560>display version | in (Huawei|H3C).*(Software|uptime)
//! H3C Comware Software, Version 7.1.070, Release 1309P01
//! H3C S5560-30C-EI uptime is 12 weeks, 3 days, 4 hours, 27 minutes
//! ```
//!
//! # MAC Table Row
//!
//! ```text
//! 0000-5e00-0101  100       Learned          GE1/0/52                 Y
//! ```

use crate::platform::VendorProfile;

/// Create the H3C profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new("h3c")
        .with_signature("H3C ")
        .with_paging_command("screen-length disable")
        .with_save_command("save force")
        .with_logout_command("quit\rquit\r")
        .with_l2_commands(
            "display ip routing-table 0.0.0.0 0",
            "disp arp {ip}",
            "display mac-address {mac}",
        )
        .with_uplink_column(2)
        .with_model_pattern(r"^h3c.*uptime", r" *uptime.*$")
        .expect("h3c model pattern must compile")
}
