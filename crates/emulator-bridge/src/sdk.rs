//! Android SDK location
//!
//! Resolves the SDK root and the paths derived from it.

use std::path::{Path, PathBuf};

/// Variable the termination routine reads to find the adb binary
pub const ADB_HOME_VAR: &str = "ADB_HOME";

/// Primary SDK root variable
pub const ANDROID_HOME_VAR: &str = "ANDROID_HOME";

/// Fallback SDK root variable
pub const ANDROID_SDK_ROOT_VAR: &str = "ANDROID_SDK_ROOT";

/// Pick the SDK root from `ANDROID_HOME`, falling back to `ANDROID_SDK_ROOT`.
///
/// `lookup` is the environment accessor, so callers decide where variables
/// come from.
pub fn sdk_root_from<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    [ANDROID_HOME_VAR, ANDROID_SDK_ROOT_VAR]
        .into_iter()
        .filter_map(&lookup)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// SDK root from the current process environment
pub fn sdk_root_from_env() -> Option<PathBuf> {
    sdk_root_from(|var| std::env::var(var).ok())
}

/// Directory holding adb
pub fn adb_home(sdk_root: &Path) -> PathBuf {
    sdk_root.join("platform-tools")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_android_home_wins() {
        let vars = env(&[("ANDROID_HOME", "/opt/sdk"), ("ANDROID_SDK_ROOT", "/other")]);
        assert_eq!(sdk_root_from(|k| vars.get(k).cloned()), Some(PathBuf::from("/opt/sdk")));
    }

    #[test]
    fn test_falls_back_to_sdk_root() {
        let vars = env(&[("ANDROID_HOME", ""), ("ANDROID_SDK_ROOT", "/other")]);
        assert_eq!(sdk_root_from(|k| vars.get(k).cloned()), Some(PathBuf::from("/other")));
        assert_eq!(sdk_root_from(|_| None), None);
    }

    #[test]
    fn test_adb_home() {
        assert_eq!(
            adb_home(Path::new("/opt/sdk")),
            PathBuf::from("/opt/sdk/platform-tools")
        );
    }
}
