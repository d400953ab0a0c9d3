//! Bad inputs are rejected before any container starts.

use logwire_core::error::HarnessError;

use crate::helpers::Fixture;

#[tokio::test(start_paused = true)]
async fn missing_artifact_starts_nothing() {
    let fixture = Fixture::new(8);
    let missing = fixture.path("missing.zip");
    let fixture = fixture.configure(|c| c.function.artifact_path = missing);

    let err = fixture.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::FatalProvision { ref resource, .. } if resource == "function artifact"));
    assert!(err.to_string().contains("missing.zip"));
    assert!(fixture.runtime.pulled().is_empty());
}

#[tokio::test(start_paused = true)]
async fn malformed_stubs_start_nothing() {
    let fixture = Fixture::new(8);
    let stubs = fixture.path("bad-stubs.json");
    std::fs::write(&stubs, r#"{"rules": []}"#).unwrap();
    let fixture = fixture.configure(|c| c.payloads.stubs_path = stubs);

    let err = fixture.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::FatalProvision { ref resource, .. } if resource == "mock api stubs"));
    assert!(fixture.runtime.pulled().is_empty());
    assert!(fixture.registry.imports().is_empty());
}
