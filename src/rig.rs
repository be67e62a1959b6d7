//! Rig mapping: humanoid joint names to the bone names of a source rig.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Maps the abstract humanoid joint names (e.g. "right hip") to the bone
/// names as they appear in a given .bvh skeleton. Loaded once per run,
/// immutable thereafter.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RigMapping {
    bones: HashMap<String, String>,
}

impl RigMapping {
    /// Load a mapping from a JSON object of joint name to bone name.
    pub fn load(path: impl AsRef<Path>) -> Result<RigMapping> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<RigMapping> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("not a JSON object of bone names: {e}")))
    }

    /// Bone name mapped to an abstract joint name.
    pub fn bone(&self, joint: &str) -> Result<&str> {
        self.bones
            .get(joint)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("no bone mapped for joint {joint:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_json_object() {
        let mapping = RigMapping::from_json(r#"{"hip": "Hips", "neck": "Neck"}"#).unwrap();
        assert_eq!(mapping.bone("hip").unwrap(), "Hips");
        assert_eq!(mapping.bone("neck").unwrap(), "Neck");
    }

    #[test]
    fn missing_joint_is_a_config_error() {
        let mapping = RigMapping::from_json(r#"{"hip": "Hips"}"#).unwrap();
        match mapping.bone("left elbow") {
            Err(Error::Config(message)) => assert!(message.contains("left elbow")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        assert!(matches!(
            RigMapping::from_json(r#"["hip", "Hips"]"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(RigMapping::from_json("{"), Err(Error::Config(_))));
    }
}
