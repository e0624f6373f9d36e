//! Cisco Nexus (NX-OS) profile.
//!
//! # Version Probe Example
//!
//! ```text
//! BJ_XX_311-F-02_N7718-1# show version | in Cisco.*Software|cisco.*(Chassis|processor)
//! Cisco Nexus Operating System (NX-OS) Software
//!   cisco Nexus7700 C7718 (18 Slot) Chassis ("Supervisor Module-2")
//! ```
//!
//! # MAC Table Row
//!
//! ```text
//! *  100     0000.0c9f.f064   dynamic  0         F      F    Eth1/49
//! ```

use crate::platform::VendorProfile;

/// Create the Cisco Nexus profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new("cisco_nexus")
        .with_signature("Cisco Nexus ")
        .with_paging_command("terminal length 0")
        .with_save_command("copy run start")
        .with_logout_command("end\rexit")
        .with_l2_commands(
            "show ip route 0.0.0.0/0",
            "show ip arp {ip}",
            "show mac address-table address {mac}",
        )
        .with_uplink_column(4)
        .with_model_pattern(r"^cisco.*chassis", r" *(\(|chassis).*$")
        .expect("cisco_nexus model pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nexus_profile() {
        let profile = profile();
        assert_eq!(profile.id, "cisco_nexus");
        assert_eq!(profile.save_command.as_deref(), Some("copy run start"));
        assert_eq!(profile.gateway_ip_command.as_deref(), Some("show ip route 0.0.0.0/0"));
        assert_eq!(profile.uplink_column, 4);
    }

    #[test]
    fn test_nexus_model() {
        let output = "show version | in Cisco.*Software|cisco.*(Chassis|processor)\r\n\
            Cisco Nexus Operating System (NX-OS) Software\r\n\
            \x20 cisco Nexus7700 C7718 (18 Slot) Chassis (\"Supervisor Module-2\")\r\n\
            BJ_XX_311-F-02_N7718-1# ";
        assert_eq!(profile().extract_model(output).as_deref(), Some("Nexus7700 C7718"));
    }

    #[test]
    fn test_nexus_model_without_slot_count() {
        let output = "cisco Nexus9000 C93180YC-EX chassis\r\n";
        assert_eq!(profile().extract_model(output).as_deref(), Some("Nexus9000 C93180YC-EX"));
    }
}
