use scholarstream::prelude::*;
use scholarstream::{bootstrap_from, BootstrapError, ConfigError};
use scholarstream_test::{fixtures, MockApi};
use serial_test::serial;

fn write_config(dir: &std::path::Path, yaml: &str) {
    std::fs::write(dir.join("scholarstream.yaml"), yaml).unwrap();
}

#[tokio::test]
#[serial]
async fn bootstrapped_context_talks_to_the_configured_api() {
    let mock = MockApi::start().await.unwrap();
    mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "10"));
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        &format!(
            "scholarstream:\n  api:\n    url: \"{}\"\n    timeout: 5\n  cache:\n    ttl: 60\n",
            mock.base_url()
        ),
    );

    let provider = InMemoryIdentityProvider::new()
        .with_user("ana@uni.edu", "secret1", Some("Ana"))
        .with_persisted_session("ana@uni.edu");
    let ctx = bootstrap_from(dir.path(), "test", provider).unwrap();
    assert_eq!(ctx.settings().api.timeout, Some(std::time::Duration::from_secs(5)));

    let page = ScholarshipCatalog::new(ctx.clone()).load().await;
    assert_eq!(page.data.map(|p| p.total), Some(1));

    let identity = ctx.require_identity().await.unwrap();
    assert_eq!(identity.email, "ana@uni.edu");
}

#[tokio::test]
#[serial]
async fn invalid_api_url_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "scholarstream:\n  api:\n    url: \"not a url\"\n");

    let err = bootstrap_from(dir.path(), "test", InMemoryIdentityProvider::new())
        .err()
        .expect("bootstrap fails");
    assert!(matches!(
        err,
        BootstrapError::Config(ConfigError::Invalid { ref key, .. }) if key == "scholarstream.api.url"
    ));
    assert!(err.to_string().starts_with("Configuration error"));
}

#[tokio::test]
#[serial]
async fn missing_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = bootstrap_from(dir.path(), "dev", InMemoryIdentityProvider::new()).unwrap();
    assert_eq!(ctx.settings().api.base_url.as_str(), "http://localhost:3001/");
    assert!(ctx.session().resolved().await.is_none());
}
