//! A start that fails before the configured subscriber exists still logs.
//!
//! Kept in its own test binary: it checks the process-wide subscriber.

use sigbridge_runtime::{ConfigLoader, RuntimeError, Supervisor};

#[tokio::test]
async fn config_failure_installs_fallback_subscriber() {
    assert!(!tracing::dispatcher::has_been_set());

    let dir = tempfile::tempdir().unwrap();
    let loader = ConfigLoader::new()
        .file(dir.path().join("missing.toml"))
        .without_env();
    let supervisor = Supervisor::new(loader);

    let err = supervisor.start(0).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)), "{err}");
    assert!(tracing::dispatcher::has_been_set());
    assert!(supervisor.version_info().is_none());
}
