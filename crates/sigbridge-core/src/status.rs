//! Read-only lifecycle and version information.
//!
//! These types are what the runtime publishes and what the management layer
//! reads. Nothing here can change the running system.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::adapter::SoftwareInfo;

/// Name of the bridge core as reported in [`VersionInfo`].
pub const CORE_NAME: &str = "sigbridge";

/// Version of the bridge core as reported in [`VersionInfo`].
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle state of the integration executive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutiveState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ExecutiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        }
    }

    /// Whether `start()` is permitted from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Whether `stop()` is permitted from this state.
    pub fn can_stop(&self) -> bool {
        matches!(self, Self::Running | Self::Failed)
    }
}

impl fmt::Display for ExecutiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of both adapters' software info and the core identity.
///
/// Captured once when the executive first starts successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub core: SoftwareInfo,
    pub external_system: SoftwareInfo,
    pub process_model: SoftwareInfo,
    /// Seconds since the unix epoch at capture time.
    pub started_at: u64,
}

impl VersionInfo {
    /// Captures version info now, with this crate's identity as the core.
    pub fn capture(external_system: SoftwareInfo, process_model: SoftwareInfo) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            core: SoftwareInfo::new(CORE_NAME, CORE_VERSION),
            external_system,
            process_model,
            started_at,
        }
    }
}

/// Point-in-time view of the executive for status consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveStatus {
    pub state: ExecutiveState,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Arc<VersionInfo>>,
}

/// Source of read-only status for the management layer.
pub trait StatusSource: Send + Sync {
    /// Current executive status, or `None` when nothing is started.
    fn executive_status(&self) -> Option<ExecutiveStatus>;

    /// Version snapshot, or `None` before the first successful start.
    fn version_info(&self) -> Option<Arc<VersionInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_guards() {
        assert!(ExecutiveState::Stopped.can_start());
        assert!(!ExecutiveState::Failed.can_start());
        assert!(!ExecutiveState::Running.can_start());

        assert!(ExecutiveState::Running.can_stop());
        assert!(ExecutiveState::Failed.can_stop());
        assert!(!ExecutiveState::Stopped.can_stop());
        assert!(!ExecutiveState::Starting.can_stop());
        assert!(!ExecutiveState::Stopping.can_stop());
    }

    #[test]
    fn test_capture_uses_core_identity() {
        let info = VersionInfo::capture(
            SoftwareInfo::new("plant", "1.2"),
            SoftwareInfo::new("model", "3.4"),
        );
        assert_eq!(info.core.name, CORE_NAME);
        assert_eq!(info.core.version, CORE_VERSION);
        assert_eq!(info.external_system.name, "plant");
        assert_eq!(info.process_model.version, "3.4");
    }
}
