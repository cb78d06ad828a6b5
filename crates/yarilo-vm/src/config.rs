//! VM configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default limit on nested non-streaming procedure calls. Reached well
/// before a 2 MiB thread stack runs out.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Tunables for one [`Vm`](crate::Vm) instance.
///
/// Every field has a default, so a partial JSON object is accepted:
///
/// ```
/// let config = yarilo_vm::VmConfig::from_json(r#"{ "trace": true }"#).unwrap();
/// assert!(config.trace);
/// assert_eq!(config.max_call_depth, yarilo_vm::config::DEFAULT_MAX_CALL_DEPTH);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Emit a `tracing` event for every cursor step.
    pub trace: bool,
    pub max_call_depth: usize,
    /// Base directory for relative module paths.
    pub module_root: Option<PathBuf>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            module_root: None,
        }
    }
}

impl VmConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_module_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.module_root = Some(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VmConfig::default();
        assert!(!config.trace);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(config.module_root, None);
    }

    #[test]
    fn test_from_json() {
        let config =
            VmConfig::from_json(r#"{"max_call_depth": 16, "module_root": "/srv/y"}"#).unwrap();
        assert_eq!(config.max_call_depth, 16);
        assert_eq!(config.module_root, Some(PathBuf::from("/srv/y")));
        assert!(!config.trace);
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(VmConfig::from_json(r#"{"trace": "yes"}"#).is_err());
    }

    #[test]
    fn test_builders() {
        let config = VmConfig::default()
            .with_trace(true)
            .with_max_call_depth(4)
            .with_module_root("mods");
        assert!(config.trace);
        assert_eq!(config.max_call_depth, 4);
        assert_eq!(config.module_root, Some(PathBuf::from("mods")));
    }
}
