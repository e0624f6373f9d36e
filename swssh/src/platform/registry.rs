//! Global vendor registry for looking up profiles.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::definition::VendorProfile;
use super::vendors;

/// Id of the fallback profile.
pub const UNKNOWN_VENDOR: &str = "unknown";

/// Global vendor registry.
static REGISTRY: Lazy<VendorRegistry> = Lazy::new(VendorRegistry::builtin);

/// Vendor profiles in detection priority order, plus the unknown sentinel.
#[derive(Debug)]
pub struct VendorRegistry {
    vendors: IndexMap<String, VendorProfile>,
    unknown: VendorProfile,
}

impl VendorRegistry {
    /// Create a registry with no vendors.
    pub fn new() -> Self {
        Self {
            vendors: IndexMap::new(),
            unknown: VendorProfile::new(UNKNOWN_VENDOR),
        }
    }

    /// Registry with the built-in vendors.
    ///
    /// Order matters: "H3C " and "Huawei " are checked before the Cisco
    /// signatures, and "Cisco Nexus " before the shorter "Cisco ".
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(vendors::h3c::profile());
        registry.register(vendors::huawei::profile());
        registry.register(vendors::cisco_nexus::profile());
        registry.register(vendors::cisco::profile());
        registry
    }

    /// Get the global registry.
    pub fn global() -> &'static VendorRegistry {
        &REGISTRY
    }

    /// Register a profile at the lowest priority, replacing any with the same id.
    pub fn register(&mut self, profile: VendorProfile) {
        self.vendors.insert(profile.id.clone(), profile);
    }

    /// Get a profile by id.
    pub fn get(&self, id: &str) -> Option<&VendorProfile> {
        self.vendors.get(id)
    }

    /// The profile used when no vendor was identified.
    pub fn unknown(&self) -> &VendorProfile {
        &self.unknown
    }

    /// First profile, in priority order, whose signature occurs in `output`.
    pub fn detect(&self, output: &str) -> Option<&VendorProfile> {
        self.vendors.values().find(|profile| {
            profile
                .signature
                .as_deref()
                .is_some_and(|signature| output.contains(signature))
        })
    }

    /// Registered vendor ids in priority order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.vendors.keys().map(String::as_str)
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let ids: Vec<_> = VendorRegistry::global().ids().collect();
        assert_eq!(ids, ["h3c", "huawei", "cisco_nexus", "cisco"]);
    }

    #[test]
    fn test_detect_priority() {
        let registry = VendorRegistry::global();
        let nexus = "Cisco Nexus Operating System (NX-OS) Software";
        assert_eq!(registry.detect(nexus).unwrap().id, "cisco_nexus");

        let ios = "Cisco IOS Software, C2960S Software (C2960S-UNIVERSALK9-M)";
        assert_eq!(registry.detect(ios).unwrap().id, "cisco");

        assert_eq!(registry.detect("H3C Comware Software").unwrap().id, "h3c");
        assert_eq!(
            registry.detect("Huawei Versatile Routing Platform Software").unwrap().id,
            "huawei"
        );
    }

    #[test]
    fn test_detect_requires_trailing_space() {
        let registry = VendorRegistry::global();
        assert!(registry.detect("display version | in (Huawei|H3C).*(Software|uptime)").is_none());
        assert!(registry.detect("% Invalid input detected at '^' marker.").is_none());
    }

    #[test]
    fn test_unknown_sentinel() {
        let registry = VendorRegistry::global();
        assert!(registry.get(UNKNOWN_VENDOR).is_none());
        assert_eq!(registry.unknown().id, UNKNOWN_VENDOR);
        assert_eq!(registry.unknown().logout_command, "exit");
    }

    #[test]
    fn test_register_custom() {
        let mut registry = VendorRegistry::new();
        registry.register(VendorProfile::new("acme").with_signature("ACME "));
        assert_eq!(registry.detect("ACME Switch OS").unwrap().id, "acme");
        assert!(registry.get("acme").is_some());
    }
}
