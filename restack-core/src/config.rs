//! Deployment configuration and fixed conventions.

use std::time::Duration;

/// Parameter key carrying the template fingerprint on the remote stack.
pub const TEMPLATE_SHA_KEY: &str = "TemplateSHA";

/// Suffix appended to the base deployment name to form the stack name.
pub const STACK_NAME_SUFFIX: &str = "-resources";

/// Region used when neither an explicit option nor the host supplies one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Settings for a reconciliation run.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Delay between status polls. Constant; the poller applies no backoff.
    pub poll_interval: Duration,
    /// Substrings that mark a status code as terminal.
    ///
    /// Matching is plain substring containment for compatibility with the
    /// provider's status vocabulary, so a longer code that merely contains
    /// a marker also classifies as terminal.
    pub terminal_markers: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            terminal_markers: default_terminal_markers(),
        }
    }
}

/// The provider's "finished" status families.
pub fn default_terminal_markers() -> Vec<String> {
    vec!["_COMPLETE".to_string(), "_FAILED".to_string()]
}

/// Stack name for a base deployment name: the host's naming convention plus
/// the fixed suffix. This layer never invents the base name.
pub fn stack_name(base: &str) -> String {
    format!("{}{}", base, STACK_NAME_SUFFIX)
}

/// Region for a run: explicit option first, then the host's ambient
/// default, then the fixed fallback.
pub fn resolve_region(explicit: Option<&str>, ambient: Option<&str>) -> String {
    explicit.or(ambient).unwrap_or(DEFAULT_REGION).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_name_appends_suffix() {
        assert_eq!(stack_name("web-prod"), "web-prod-resources");
    }

    #[test]
    fn region_resolution_order() {
        assert_eq!(resolve_region(Some("eu-west-1"), Some("us-west-2")), "eu-west-1");
        assert_eq!(resolve_region(None, Some("us-west-2")), "us-west-2");
        assert_eq!(resolve_region(None, None), "us-east-1");
    }

    #[test]
    fn default_config_matches_conventions() {
        let config = DeployConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.terminal_markers, vec!["_COMPLETE", "_FAILED"]);
    }
}
