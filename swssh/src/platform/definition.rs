//! Vendor profile: command dialect and parsing rules for one device family.

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::uplink::{self, DEFAULT_GATEWAY_IP, DEFAULT_MAC};

/// Vendor token left at the start of a model line.
static VENDOR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^(cisco nexus|cisco|h3c|huawei)\b *")
        .case_insensitive(true)
        .build()
        .expect("vendor prefix pattern must compile")
});

/// Everything the automaton needs to know about one vendor.
///
/// Profiles are immutable once registered and are looked up by `id` or by
/// the signature found in version output.
#[derive(Clone)]
pub struct VendorProfile {
    /// Vendor id (e.g., "cisco", "h3c").
    pub id: String,

    /// Substring of the version output that identifies this vendor.
    pub signature: Option<String>,

    /// Command that disables output pagination.
    pub paging_command: Option<String>,

    /// Save sequence; `\r` separates keypresses.
    pub save_command: Option<String>,

    /// Logout sequence; `\r` separates keypresses.
    pub logout_command: String,

    /// Default-route / gateway lookup.
    pub gateway_ip_command: Option<String>,

    /// ARP lookup, with `{ip}` replaced by the gateway address.
    pub gateway_mac_command: Option<String>,

    /// MAC table lookup, with `{mac}` replaced by the gateway MAC.
    pub mac_table_command: Option<String>,

    /// Index of the port among the fields following the MAC in a table row.
    pub uplink_column: usize,

    /// Gateway address in default-route output.
    gateway_ip_pattern: Regex,

    /// MAC address in ARP and MAC table output.
    mac_pattern: Regex,

    /// Line of the version output that carries the model.
    model_anchor: Option<Regex>,

    /// Trailing description removed from the model line.
    model_suffix: Option<Regex>,
}

impl VendorProfile {
    /// Create a profile with no commands and the plain `exit` logout.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            signature: None,
            paging_command: None,
            save_command: None,
            logout_command: "exit".to_string(),
            gateway_ip_command: None,
            gateway_mac_command: None,
            mac_table_command: None,
            uplink_column: 0,
            gateway_ip_pattern: DEFAULT_GATEWAY_IP.clone(),
            mac_pattern: DEFAULT_MAC.clone(),
            model_anchor: None,
            model_suffix: None,
        }
    }

    /// Set the version-output signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Set the pagination-disable command.
    pub fn with_paging_command(mut self, command: impl Into<String>) -> Self {
        self.paging_command = Some(command.into());
        self
    }

    /// Set the save sequence.
    pub fn with_save_command(mut self, command: impl Into<String>) -> Self {
        self.save_command = Some(command.into());
        self
    }

    /// Set the logout sequence.
    pub fn with_logout_command(mut self, command: impl Into<String>) -> Self {
        self.logout_command = command.into();
        self
    }

    /// Set the three layer-2 discovery commands.
    pub fn with_l2_commands(
        mut self,
        gateway_ip: impl Into<String>,
        gateway_mac: impl Into<String>,
        mac_table: impl Into<String>,
    ) -> Self {
        self.gateway_ip_command = Some(gateway_ip.into());
        self.gateway_mac_command = Some(gateway_mac.into());
        self.mac_table_command = Some(mac_table.into());
        self
    }

    /// Set the uplink column.
    pub fn with_uplink_column(mut self, column: usize) -> Self {
        self.uplink_column = column;
        self
    }

    /// Replace the pattern that finds the gateway in default-route output.
    ///
    /// If the pattern has a capture group, the first group is the address.
    pub fn with_gateway_ip_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.gateway_ip_pattern = Regex::new(pattern)?;
        Ok(self)
    }

    /// Replace the MAC address pattern used for ARP and MAC table output.
    pub fn with_mac_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.mac_pattern = Regex::new(pattern)?;
        Ok(self)
    }

    /// Set the model anchor and suffix patterns (both case-insensitive).
    pub fn with_model_pattern(mut self, anchor: &str, suffix: &str) -> Result<Self, regex::Error> {
        self.model_anchor = Some(RegexBuilder::new(anchor).case_insensitive(true).build()?);
        self.model_suffix = Some(RegexBuilder::new(suffix).case_insensitive(true).build()?);
        Ok(self)
    }

    /// Whether this is the fallback profile used before identification.
    pub fn is_unknown(&self) -> bool {
        self.signature.is_none()
    }

    /// Pull the bare model out of version output.
    ///
    /// The first trimmed line matching the anchor is used; its descriptive
    /// suffix and leading vendor token are removed.
    pub fn extract_model(&self, output: &str) -> Option<String> {
        let anchor = self.model_anchor.as_ref()?;
        let row = output.lines().map(str::trim).find(|row| anchor.is_match(row))?;

        let row = match &self.model_suffix {
            Some(suffix) => suffix.replace(row, ""),
            None => row.into(),
        };
        let model = VENDOR_PREFIX.replace(&row, "").trim().to_string();
        (!model.is_empty()).then_some(model)
    }

    /// ARP command for `ip`, if the vendor supports layer-2 discovery.
    pub fn gateway_mac_command(&self, ip: &str) -> Option<String> {
        self.gateway_mac_command
            .as_ref()
            .map(|template| template.replace("{ip}", ip))
    }

    /// MAC table command for `mac`, if the vendor supports layer-2 discovery.
    pub fn mac_table_command(&self, mac: &str) -> Option<String> {
        self.mac_table_command
            .as_ref()
            .map(|template| template.replace("{mac}", mac))
    }

    /// Gateway address from default-route output.
    pub fn extract_gateway_ip(&self, output: &str) -> Option<String> {
        uplink::extract_gateway_ip(output, &self.gateway_ip_pattern)
    }

    /// Gateway MAC from ARP output.
    pub fn extract_mac(&self, output: &str) -> Option<String> {
        uplink::extract_mac(output, &self.mac_pattern)
    }

    /// Port holding `mac` in the output of the MAC table `command`.
    pub fn extract_uplink(&self, output: &str, command: &str, mac: &str) -> Option<String> {
        uplink::extract_uplink(output, command, mac, self.uplink_column, &self.mac_pattern)
    }
}

impl fmt::Debug for VendorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorProfile")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("paging_command", &self.paging_command)
            .field("save_command", &self.save_command)
            .field("logout_command", &self.logout_command)
            .field("gateway_ip_command", &self.gateway_ip_command)
            .field("gateway_mac_command", &self.gateway_mac_command)
            .field("mac_table_command", &self.mac_table_command)
            .field("uplink_column", &self.uplink_column)
            .field("gateway_ip_pattern", &self.gateway_ip_pattern.as_str())
            .field("mac_pattern", &self.mac_pattern.as_str())
            .field("model_anchor", &self.model_anchor.as_ref().map(Regex::as_str))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile_defaults() {
        let profile = VendorProfile::new("unknown");
        assert!(profile.is_unknown());
        assert_eq!(profile.logout_command, "exit");
        assert!(profile.paging_command.is_none());
        assert!(profile.extract_model("Cisco IOS Software").is_none());
        assert!(profile.gateway_mac_command("10.0.0.1").is_none());
    }

    #[test]
    fn test_templates() {
        let profile = VendorProfile::new("test").with_l2_commands(
            "show gw",
            "show arp {ip}",
            "show mac {mac}",
        );
        assert_eq!(
            profile.gateway_mac_command("10.0.0.1").as_deref(),
            Some("show arp 10.0.0.1")
        );
        assert_eq!(
            profile.mac_table_command("0000.0c9f.f001").as_deref(),
            Some("show mac 0000.0c9f.f001")
        );
    }

    #[test]
    fn test_invalid_model_pattern() {
        assert!(VendorProfile::new("bad").with_model_pattern("(", "").is_err());
        assert!(VendorProfile::new("bad").with_mac_pattern("[").is_err());
        assert!(VendorProfile::new("bad").with_gateway_ip_pattern("(").is_err());
    }

    #[test]
    fn test_default_l2_patterns() {
        let profile = VendorProfile::new("test").with_uplink_column(2);
        assert_eq!(
            profile.extract_gateway_ip("0.0.0.0/0  Static  10.0.0.1  Vlan100").as_deref(),
            Some("10.0.0.1")
        );
        assert_eq!(
            profile.extract_mac("10.0.0.1  0000-5e00-0101  100  GE1/0/52").as_deref(),
            Some("0000-5e00-0101")
        );
        let table = "0000-5e00-0101   100   Learned   GE1/0/52   Y";
        assert_eq!(
            profile.extract_uplink(table, "display mac-address", "0000-5e00-0101").as_deref(),
            Some("GE1/0/52")
        );
    }

    #[test]
    fn test_colon_mac_vendor() {
        let profile = VendorProfile::new("linux")
            .with_l2_commands("ip route show default", "ip neigh show {ip}", "bridge fdb show {mac}")
            .with_uplink_column(1)
            .with_gateway_ip_pattern(r"via (\S+)")
            .unwrap()
            .with_mac_pattern(r"(?i)(?:[0-9a-f]{2}:){5}[0-9a-f]{2}")
            .unwrap();

        let route = "default via 10.0.0.1 dev eth0 proto static";
        assert_eq!(profile.extract_gateway_ip(route).as_deref(), Some("10.0.0.1"));

        let mac = profile
            .extract_mac("10.0.0.1 dev eth0 lladdr 00:00:5e:00:01:01 REACHABLE")
            .unwrap();
        assert_eq!(mac, "00:00:5e:00:01:01");

        let command = profile.mac_table_command(&mac).unwrap();
        let output = format!("{command}\r\n00:00:5e:00:01:01 dev swp49 master br0\r\n");
        assert_eq!(profile.extract_uplink(&output, &command, &mac).as_deref(), Some("swp49"));
    }

    #[test]
    fn test_vendor_prefix_needs_word_boundary() {
        assert_eq!(VENDOR_PREFIX.replace("cisco Nexus7700 C7718", ""), "Nexus7700 C7718");
        assert_eq!(VENDOR_PREFIX.replace("HUAWEI CE5810-48T4S-EI", ""), "CE5810-48T4S-EI");
    }
}
