use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RagError, Result};

/// What a task does when an upstream file is absent or unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    #[default]
    Strict,
    Fallback,
}

impl LoadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPolicy::Strict => "strict",
            LoadPolicy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadPolicy {
    type Err = RagError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "strict" => Ok(LoadPolicy::Strict),
            "fallback" | "fallback-to-default" | "fallback_to_default" => Ok(LoadPolicy::Fallback),
            other => Err(RagError::UnknownPolicy(other.to_string())),
        }
    }
}

pub fn load_txt(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Reads a JSON file written by an upstream task.
pub fn load_json<T: DeserializeOwned>(path: &Path, upstream: &str) -> Result<T> {
    if !path.exists() {
        return Err(RagError::missing(path, upstream));
    }
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| RagError::CorruptInput(format!("{}: {err}", path.display())))
}

/// Like [`load_json`], but under [`LoadPolicy::Fallback`] a missing or
/// malformed file yields `fallback()` instead of an error.
pub fn load_json_with_policy<T, F>(
    path: &Path,
    upstream: &str,
    policy: LoadPolicy,
    fallback: F,
) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match load_json(path, upstream) {
        Ok(value) => Ok(value),
        Err(err @ (RagError::MissingPrerequisite { .. } | RagError::CorruptInput(_)))
            if policy == LoadPolicy::Fallback =>
        {
            warn!(path = %path.display(), error = %err, "using default payload");
            Ok(fallback())
        }
        Err(err) => Err(err),
    }
}

pub fn save_txt(text: &str, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, text)?;
    Ok(())
}

pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroundTruth;
    use tempfile::tempdir;

    #[test]
    fn policy_parses_aliases() {
        assert_eq!("STRICT".parse::<LoadPolicy>().unwrap(), LoadPolicy::Strict);
        assert_eq!(
            "fallback-to-default".parse::<LoadPolicy>().unwrap(),
            LoadPolicy::Fallback
        );
        assert!("lenient".parse::<LoadPolicy>().is_err());
    }

    #[test]
    fn strict_policy_reports_missing_upstream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("task_4_groundtruth.json");
        let err = load_json_with_policy::<GroundTruth, _>(
            &path,
            "task 4",
            LoadPolicy::Strict,
            GroundTruth::fallback,
        )
        .unwrap_err();
        assert!(err.is_missing_prerequisite());
        assert!(err.to_string().contains("run task 4 first"));
    }

    #[test]
    fn fallback_policy_covers_missing_and_malformed_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("truth.json");
        let loaded =
            load_json_with_policy(&path, "task 4", LoadPolicy::Fallback, GroundTruth::fallback)
                .unwrap();
        assert_eq!(loaded, GroundTruth::fallback());

        fs::write(&path, "{not json").unwrap();
        let loaded =
            load_json_with_policy(&path, "task 4", LoadPolicy::Fallback, GroundTruth::fallback)
                .unwrap();
        assert_eq!(loaded, GroundTruth::fallback());

        let strict = load_json::<GroundTruth>(&path, "task 4").unwrap_err();
        assert!(matches!(strict, RagError::CorruptInput(_)));
    }

    #[test]
    fn save_json_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outputs/nested/truth.json");
        save_json(&GroundTruth::fallback(), &path).unwrap();
        let back: GroundTruth = load_json(&path, "task 4").unwrap();
        assert_eq!(back.groundtruth_answers.len(), 8);
    }
}
