use super::route::RouteType;

/// Engine-level policy knobs that are not per-role.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Role assigned to streams that arrive without one (default: "media").
    pub default_role: String,

    /// Media names of internal probe streams that never take part in
    /// arbitration (default: pavucontrol's "Peak detect" and "probe").
    pub skip_stream_names: Vec<String>,

    /// Priority used when a role entry has none (default: lowest possible).
    pub fallback_priority: i32,

    /// Route type used when a role entry has none (default: AUTO).
    pub fallback_route_type: RouteType,

    /// Mute streams attached to a device while it is being disconnected
    /// (default: true).
    pub mute_on_disconnect: bool,
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_role.trim().is_empty() {
            return Err("default role must not be empty".into());
        }
        if self.skip_stream_names.iter().any(|n| n.is_empty()) {
            return Err("skip stream names must not be empty".into());
        }
        Ok(())
    }

    pub fn is_skipped_name(&self, name: &str) -> bool {
        self.skip_stream_names.iter().any(|n| n == name)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_role: "media".into(),
            skip_stream_names: vec!["Peak detect".into(), "probe".into()],
            fallback_priority: i32::MIN,
            fallback_route_type: RouteType::Auto,
            mute_on_disconnect: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PolicyConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_skipped_name("Peak detect"));
        assert!(!config.is_skipped_name("music"));
    }

    #[test]
    fn empty_default_role_rejected() {
        let config = PolicyConfig {
            default_role: " ".into(),
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
