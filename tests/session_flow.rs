use session_manager::{
    ConflictField, MemoryStore, RegisterRequest, SessionConfig, SessionError, SessionManager,
    TokenCodec,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn test_config() -> SessionConfig {
    SessionConfig {
        database_url: "memory".to_string(),
        db_max_connections: 1,
        jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
        token_ttl: None,
        argon2_memory_cost: 64,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
    }
}

fn manager() -> SessionManager {
    SessionManager::with_store(&test_config(), Arc::new(MemoryStore::new())).unwrap()
}

#[tokio::test]
async fn alice_scenario() {
    let manager = manager();

    assert_ok!(
        manager
            .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
            .await
    );

    let err = assert_err!(
        manager
            .register(RegisterRequest::new("alice", "other@x.com", "p2"))
            .await
    );
    assert_eq!(err, SessionError::Conflict(vec![ConflictField::Username]));

    let token = assert_ok!(manager.authenticate("alice", "p1").await);
    assert_eq!(manager.validate_token(&token).await, Ok(true));

    assert_ok!(manager.revoke(&token).await);
    assert_eq!(manager.validate_token(&token).await, Ok(false));
}

#[tokio::test]
async fn second_registration_with_same_username_conflicts() {
    let manager = manager();

    for (i, name) in ["bob", "carol", "dave"].iter().enumerate() {
        assert_ok!(
            manager
                .register(RegisterRequest::new(*name, format!("{name}@x.com"), "pw"))
                .await
        );
        let err = assert_err!(
            manager
                .register(RegisterRequest::new(*name, format!("fresh{i}@y.com"), "pw"))
                .await
        );
        assert_eq!(err, SessionError::Conflict(vec![ConflictField::Username]));
    }
}

#[tokio::test]
async fn authentication_failures_are_indistinguishable() {
    let manager = manager();
    manager
        .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
        .await
        .unwrap();

    assert_ok!(manager.authenticate("alice", "p1").await);

    let wrong_password = manager.authenticate("alice", "p2").await;
    let unknown_user = manager.authenticate("zed", "p1").await;
    assert_eq!(wrong_password, Err(SessionError::NotFound));
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn garbage_tokens_are_not_valid() {
    let manager = manager();

    for garbage in ["not-a-token", "", "a.b.c", "Bearer", "eyJhbGciOiJub25lIn0.e30."] {
        assert_eq!(manager.validate_token(garbage).await, Ok(false));
    }
}

#[tokio::test]
async fn revoke_twice_is_ok() {
    let manager = manager();
    manager
        .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
        .await
        .unwrap();
    let token = manager.authenticate("alice", "p1").await.unwrap();

    assert_ok!(manager.revoke(&token).await);
    assert_ok!(manager.revoke(&token).await);
}

#[tokio::test]
async fn multiple_accounts_hold_independent_sessions() {
    let manager = manager();
    manager
        .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
        .await
        .unwrap();
    manager
        .register(RegisterRequest::new("bob", "bob@x.com", "p2"))
        .await
        .unwrap();

    let alice = manager.authenticate("alice", "p1").await.unwrap();
    let bob = manager.authenticate("bob", "p2").await.unwrap();
    assert_ne!(alice, bob);

    manager.revoke(&alice).await.unwrap();

    assert_eq!(manager.validate_token(&alice).await, Ok(false));
    assert_eq!(manager.validate_token(&bob).await, Ok(true));
}

#[test]
fn codec_round_trip() {
    let codec = TokenCodec::new(&test_config());

    for _ in 0..16 {
        let id = Uuid::new_v4();
        assert_eq!(codec.extract(&codec.mint(id).unwrap()), Ok(id));
    }
}

#[tokio::test]
async fn configured_ttl_still_validates_fresh_tokens() {
    let config = SessionConfig {
        token_ttl: Some(3600),
        ..test_config()
    };
    let manager = SessionManager::with_store(&config, Arc::new(MemoryStore::new())).unwrap();
    manager
        .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
        .await
        .unwrap();

    let token = manager.authenticate("alice", "p1").await.unwrap();
    assert_eq!(manager.validate_token(&token).await, Ok(true));
}

#[tokio::test]
async fn revoking_one_device_keeps_the_other_signed_in() {
    let manager = manager();
    manager
        .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
        .await
        .unwrap();

    let device_a = manager.authenticate("alice", "p1").await.unwrap();
    let device_b = manager.authenticate("alice", "p1").await.unwrap();
    assert_ne!(device_a, device_b);

    assert_ok!(manager.revoke(&device_a).await);

    assert_eq!(manager.validate_token(&device_a).await, Ok(false));
    assert_eq!(manager.validate_token(&device_b).await, Ok(true));
}
