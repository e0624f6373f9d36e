//! Cisco IOS / IOS-XE profile.
//!
//! # Version Probe Example
//!
//! ```text
//! BJ-XXX-2-2960S-2016#show version | in Cisco.*Software|cisco.*(Chassis|processor)
//! Cisco IOS Software, C2960S Software (C2960S-UNIVERSALK9-M), Version 15.0(2)SE4, RELEASE SOFTWARE (fc1)
//! cisco WS-C2960S-48TS-L (PowerPC405) processor (revision B0) with 131072K bytes of memory.
//! ```
//!
//! # MAC Table Row
//!
//! ```text
//!  100    0000.0c9f.f064    DYNAMIC     Gi1/0/48
//! ```

use crate::platform::VendorProfile;

/// Create the Cisco IOS profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new("cisco")
        .with_signature("Cisco ")
        .with_paging_command("terminal length 0")
        .with_save_command("end\rcopy run start\r")
        .with_logout_command("end\rexit")
        .with_l2_commands(
            "show ip default-gateway",
            "show ip arp {ip}",
            "show mac address-table address {mac}",
        )
        .with_uplink_column(1)
        .with_model_pattern(r"^cisco.*processor", r" *(\(|chassis).*$")
        .expect("cisco model pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: &str = "show version | in Cisco.*Software|cisco.*(Chassis|processor)\r\n\
        Cisco IOS Software, C2960S Software (C2960S-UNIVERSALK9-M), Version 15.0(2)SE4, RELEASE SOFTWARE (fc1)\r\n\
        cisco WS-C2960S-48TS-L (PowerPC405) processor (revision B0) with 131072K bytes of memory.\r\n\
        BJ-XXX-2-2960S-2016#";

    #[test]
    fn test_cisco_profile() {
        let profile = profile();
        assert_eq!(profile.id, "cisco");
        assert_eq!(profile.paging_command.as_deref(), Some("terminal length 0"));
        assert_eq!(profile.save_command.as_deref(), Some("end\rcopy run start\r"));
        assert_eq!(profile.logout_command, "end\rexit");
        assert_eq!(profile.uplink_column, 1);
        assert!(!profile.is_unknown());
    }

    #[test]
    fn test_cisco_model() {
        assert_eq!(profile().extract_model(VERSION).as_deref(), Some("WS-C2960S-48TS-L"));
    }

    #[test]
    fn test_cisco_model_requires_processor_line() {
        let output = "Cisco IOS Software, C2960S Software, Version 15.0(2)SE4\r\nR1#";
        assert!(profile().extract_model(output).is_none());
    }
}
