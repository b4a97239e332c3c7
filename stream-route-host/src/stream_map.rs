use std::path::Path;

use stream_route_core::{RoleTable, RouteError};

/// Stream map shipped with the host, used when none is given.
pub const DEFAULT_STREAM_MAP: &str = include_str!("../config/stream-map.json");

pub fn default_role_table() -> Result<RoleTable, RouteError> {
    RoleTable::from_json(DEFAULT_STREAM_MAP)
}

/// Load `path` if given, otherwise the built-in map.
pub fn load_or_default(path: Option<&Path>) -> Result<RoleTable, RouteError> {
    match path {
        Some(path) => RoleTable::load(path),
        None => default_role_table(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_route_core::{Direction, RouteType};

    #[test]
    fn builtin_map_loads() {
        let table = default_role_table().unwrap();
        assert!(table.contains("media"));
        assert_eq!(table.get("voip").unwrap().route_type, Some(RouteType::Manual));
        assert_eq!(table.get("ext-media").unwrap().route_type, Some(RouteType::ManualExt));
        assert!(table.get("voice-recognition").unwrap().avail_devices(Direction::Playback).is_empty());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = load_or_default(Some(Path::new("/nonexistent/stream-map.json")));
        assert!(matches!(result, Err(RouteError::Config(_))));
    }
}
