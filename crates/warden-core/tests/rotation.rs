//! Integration tests for secret rotation and the background timers

use std::sync::Arc;
use std::time::Duration;

use http::Method;
use warden_core::{AccessControl, AuthConfig, AuthError, PolicySet, RolePolicy, Section};

// Lowest cost bcrypt accepts; hashing speed is irrelevant here.
const TEST_COST: u32 = 4;

fn policies() -> PolicySet {
    PolicySet::new().with_role(
        "admin",
        RolePolicy::new().with_section(Section::new("users", "/users", true, true)),
    )
}

#[test]
fn test_capacity_one_rotation_window() {
    let config = AuthConfig::new()
        .with_retired_capacity(1)
        .with_bcrypt_cost(TEST_COST);
    let acs = AccessControl::new(&"initial-secret", policies(), config).unwrap();

    let before_first = acs.issue_token(1, "u", "admin").unwrap();
    acs.rotate_secret(b"rotated-once".to_vec());
    let between = acs.issue_token(2, "u", "admin").unwrap();
    acs.rotate_secret(b"rotated-twice".to_vec());

    // The pre-rotation secret fell out of the capacity-1 ring.
    assert!(matches!(
        acs.validate_token(&before_first),
        Err(AuthError::InvalidSignature)
    ));
    // The between-rotations token is still verifiable via the ring.
    assert_eq!(acs.validate_token(&between).unwrap().user_id, 2);
}

#[test]
fn test_rotation_invalidates_cached_claims() {
    let config = AuthConfig::new()
        .with_retired_capacity(0)
        .with_bcrypt_cost(TEST_COST);
    let acs = AccessControl::new(&"initial-secret", policies(), config).unwrap();

    let token = acs.issue_token(1, "u", "admin").unwrap();
    // Populate the token cache, then drop the only secret that
    // verifies it.
    assert!(acs.validate_token(&token).is_ok());
    acs.rotate_secret(b"fresh".to_vec());

    assert!(matches!(
        acs.validate_token(&token),
        Err(AuthError::InvalidSignature)
    ));
}

#[tokio::test]
async fn test_timed_rotation_retires_initial_secret() {
    let config = AuthConfig::new()
        .with_retired_capacity(1)
        .with_rotation_period(Duration::from_millis(50))
        .with_bcrypt_cost(TEST_COST);
    let acs = Arc::new(AccessControl::new(&"initial-secret", policies(), config).unwrap());

    let token = acs.issue_token(1, "u", "admin").unwrap();
    let tasks = acs.spawn_background();

    // Enough periods for the initial secret to be rotated out of the
    // capacity-1 ring.
    tokio::time::sleep(Duration::from_millis(400)).await;
    tasks.shutdown().await;

    assert!(matches!(
        acs.validate_token(&token),
        Err(AuthError::InvalidSignature)
    ));

    // Requests keep working against the freshly rotated secret.
    let fresh = acs.issue_token(2, "u", "admin").unwrap();
    assert!(acs.validate_token(&fresh).is_ok());
    assert!(acs.authorize("admin", "/users/2", &Method::GET));
}

#[tokio::test]
async fn test_background_tasks_shut_down_cleanly() {
    let config = AuthConfig::new()
        .with_rotation_period(Duration::from_secs(3600))
        .with_sweep_interval(Duration::from_secs(3600))
        .with_bcrypt_cost(TEST_COST);
    let acs = Arc::new(AccessControl::new(&"initial-secret", policies(), config).unwrap());

    let tasks = acs.spawn_background();
    // Shutdown must not wait out the hour-long timers.
    tokio::time::timeout(Duration::from_secs(5), tasks.shutdown())
        .await
        .expect("background tasks failed to stop promptly");

    // No rotation fired; the original secret still verifies.
    let token = acs.issue_token(1, "u", "admin").unwrap();
    assert!(acs.validate_token(&token).is_ok());
}
