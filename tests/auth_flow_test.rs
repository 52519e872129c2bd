// tests/auth_flow_test.rs
// Registration, login, repeated-failure lockout, and token lifecycle,
// exercised through AuthService against a real (in-memory) store.

use sanctum::auth::{AuthService, LoginRequest, RegisterRequest};
use sanctum::config::AuthConfig;
use sanctum::error::AppError;
use sanctum::store::Store;

async fn store_with_config() -> (Store, AuthConfig) {
    let store = Store::open("sqlite::memory:").await.unwrap();
    let mut config = AuthConfig::default();
    config.lockout_threshold = 3;
    config.lockout_duration_minutes = 15;
    (store, config)
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let (store, config) = store_with_config().await;
    let auth = AuthService::new(&store, &config);

    let registered = auth
        .register(RegisterRequest {
            username: "alice".into(),
            password: "correcthorsebattery".into(),
            email: None,
        })
        .await
        .unwrap();
    assert_eq!(registered.user.username, "alice");

    let logged_in = auth
        .login(LoginRequest {
            username: "alice".into(),
            password: "correcthorsebattery".into(),
        })
        .await
        .unwrap();
    assert_eq!(logged_in.user.id, registered.user.id);
    assert_ne!(logged_in.token, registered.token, "each login mints a fresh token");

    let resolved = auth.resolve_token(&logged_in.token).await.unwrap();
    assert_eq!(resolved, registered.user.id);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let (store, config) = store_with_config().await;
    let auth = AuthService::new(&store, &config);

    auth.register(RegisterRequest {
        username: "bob".into(),
        password: "correcthorsebattery".into(),
        email: None,
    })
    .await
    .unwrap();

    let second = auth
        .register(RegisterRequest {
            username: "bob".into(),
            password: "anotherlongpassword".into(),
            email: None,
        })
        .await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let (store, config) = store_with_config().await;
    let auth = AuthService::new(&store, &config);

    auth.register(RegisterRequest {
        username: "carol".into(),
        password: "correcthorsebattery".into(),
        email: None,
    })
    .await
    .unwrap();

    for _ in 0..3 {
        let result = auth
            .login(LoginRequest {
                username: "carol".into(),
                password: "wrong-password".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    let locked = auth
        .login(LoginRequest {
            username: "carol".into(),
            password: "correcthorsebattery".into(),
        })
        .await;
    assert!(matches!(locked, Err(AppError::Locked { .. })));
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let (store, config) = store_with_config().await;
    let auth = AuthService::new(&store, &config);

    let registered = auth
        .register(RegisterRequest {
            username: "dave".into(),
            password: "correcthorsebattery".into(),
            email: None,
        })
        .await
        .unwrap();

    auth.logout(&registered.token).await.unwrap();
    let resolved = auth.resolve_token(&registered.token).await;
    assert!(matches!(resolved, Err(AppError::Unauthorized)));
}
