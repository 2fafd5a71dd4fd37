//! Snapshot persistence between CLI invocations
//!
//! The core never touches the filesystem. The CLI keeps one JSON snapshot per
//! state file and rebuilds the environment from it on every run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use directories::ProjectDirs;
use xpunit_core::{AdvancedXpEnvironment, EnvironmentSnapshot, XpUnitPolicies};

const STATE_FILE: &str = "environment.json";

/// Default state file under the platform data directory
pub fn default_state_path() -> anyhow::Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "xpunit", "xpunit")
        .context("Could not determine project directories")?;
    Ok(proj_dirs.data_dir().join(STATE_FILE))
}

/// Read and validate a policies JSON file. Missing fields take their defaults.
pub fn load_policies(path: &Path) -> anyhow::Result<XpUnitPolicies> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read policies from {}", path.display()))?;
    let policies: XpUnitPolicies = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid policies JSON in {}", path.display()))?;
    policies.validate()?;
    Ok(policies)
}

/// Load the environment stored at `state`.
///
/// Policy precedence: `policies` file, then the snapshot's own policies, then
/// defaults. A missing state file starts an empty environment.
pub fn load_environment(
    state: &Path,
    policies: Option<&Path>,
) -> anyhow::Result<AdvancedXpEnvironment> {
    let override_policies = policies.map(load_policies).transpose()?;

    if !state.exists() {
        tracing::debug!(path = %state.display(), "No state file, starting fresh");
        let policies = override_policies.unwrap_or_default();
        return Ok(AdvancedXpEnvironment::with_policies(policies)?);
    }

    let raw = fs::read_to_string(state)
        .with_context(|| format!("Failed to read state from {}", state.display()))?;
    let mut snapshot = EnvironmentSnapshot::from_json(&raw)
        .with_context(|| format!("Corrupt state file {}", state.display()))?;

    if let Some(policies) = override_policies {
        if policies.dimension != snapshot.policies.dimension {
            bail!(
                "Policies dimension {} does not match stored dimension {}",
                policies.dimension,
                snapshot.policies.dimension
            );
        }
        snapshot.policies = policies;
    }

    let env = AdvancedXpEnvironment::restore(snapshot)
        .with_context(|| format!("Failed to restore state from {}", state.display()))?;
    tracing::debug!(path = %state.display(), units = env.len(), "Loaded state");
    Ok(env)
}

/// Write the environment snapshot to `state`, replacing it atomically.
pub fn save_environment(env: &AdvancedXpEnvironment, state: &Path) -> anyhow::Result<()> {
    if let Some(parent) = state.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = env.snapshot().to_json_pretty()?;
    let tmp = state.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, state)
        .with_context(|| format!("Failed to move snapshot into {}", state.display()))?;

    tracing::debug!(path = %state.display(), units = env.len(), "Saved state");
    Ok(())
}
