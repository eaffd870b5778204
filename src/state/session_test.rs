use super::*;
use crate::net::types::{AuthSession, Role};

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =========================================================================
// MockAuth
// =========================================================================

fn user(id: &str) -> User {
    User {
        id: id.into(),
        email: format!("{id}@example.com"),
        name: None,
        role: Role::User,
        is_active: true,
        created_at: "2024-01-01T00:00:00Z".into(),
        last_login_at: None,
    }
}

fn session_for(id: &str) -> AuthSession {
    AuthSession { user: user(id), access_token: format!("{id}-token"), refresh_token: None }
}

fn auth_err(message: &str) -> ApiError {
    ApiError::Auth { message: message.into(), code: None }
}

/// Scripted `AuthApi`. Each call pops the next queued reply; an empty queue
/// yields an auth rejection. Delays are per endpoint.
#[derive(Default)]
struct MockAuth {
    me: StdMutex<Vec<Result<User, ApiError>>>,
    login: StdMutex<Vec<Result<AuthSession, ApiError>>>,
    logout: StdMutex<Vec<Result<(), ApiError>>>,
    me_delay_ms: u64,
    login_delay_ms: u64,
    me_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    register_names: StdMutex<Vec<Option<String>>>,
}

impl MockAuth {
    fn with_me(mut self, reply: Result<User, ApiError>) -> Self {
        self.me.get_mut().unwrap().push(reply);
        self
    }

    fn with_login(mut self, reply: Result<AuthSession, ApiError>) -> Self {
        self.login.get_mut().unwrap().push(reply);
        self
    }

    fn with_logout(mut self, reply: Result<(), ApiError>) -> Self {
        self.logout.get_mut().unwrap().push(reply);
        self
    }

    fn me_delay(mut self, ms: u64) -> Self {
        self.me_delay_ms = ms;
        self
    }

    fn login_delay(mut self, ms: u64) -> Self {
        self.login_delay_ms = ms;
        self
    }
}

fn pop<T>(queue: &StdMutex<Vec<Result<T, ApiError>>>) -> Result<T, ApiError> {
    let mut queue = queue.lock().unwrap();
    if queue.is_empty() { Err(auth_err("Unauthorized")) } else { queue.remove(0) }
}

#[async_trait::async_trait]
impl AuthApi for MockAuth {
    async fn get_me(&self) -> Result<User, ApiError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(self.me_delay_ms)).await;
        pop(&self.me)
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<AuthSession, ApiError> {
        tokio::time::sleep(Duration::from_millis(self.login_delay_ms)).await;
        pop(&self.login)
    }

    async fn register(&self, email: &str, _password: &str, name: Option<&str>) -> Result<AuthSession, ApiError> {
        self.register_names.lock().unwrap().push(name.map(str::to_owned));
        if email.contains("taken") {
            Err(ApiError::from_status(409, "Email already registered", None))
        } else {
            Ok(session_for("new"))
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.logout.lock().unwrap();
        if queue.is_empty() { Ok(()) } else { queue.remove(0) }
    }
}

fn store(mock: MockAuth) -> (SessionStore, Arc<MockAuth>) {
    let mock = Arc::new(mock);
    (SessionStore::new(mock.clone()), mock)
}

/// Count notifications and record the loading flag seen by each.
fn watch(store: &SessionStore) -> Arc<StdMutex<Vec<bool>>> {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let seen_in = seen.clone();
    let observed = store.clone();
    let _sub = store.subscribe(move || seen_in.lock().unwrap().push(observed.is_loading()));
    seen
}

// =========================================================================
// init_auth
// =========================================================================

#[tokio::test]
async fn fresh_store_is_uninitialized_and_idle() {
    let (store, _) = store(MockAuth::default());
    assert_eq!(store.phase(), SessionPhase::Uninitialized);
    assert!(!store.is_loading());
    assert!(!store.is_authenticated());
    assert_eq!(store.snapshot(), SessionSnapshot::default());
}

#[tokio::test(start_paused = true)]
async fn concurrent_init_auth_shares_one_request() {
    let (store, mock) = store(MockAuth::default().with_me(Ok(user("u1"))).me_delay(50));
    let seen = watch(&store);

    let (a, b) = (store.clone(), store.clone());
    tokio::join!(a.init_auth(), b.init_auth(), store.init_auth());

    assert_eq!(mock.me_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.user().map(|u| u.id), Some("u1".into()));
    assert_eq!(store.phase(), SessionPhase::Ready);
    assert_eq!(*seen.lock().unwrap(), vec![false]);
}

#[tokio::test]
async fn init_auth_without_session_still_initializes() {
    let (store, _) = store(MockAuth::default());

    store.init_auth().await;

    assert!(store.is_initialized());
    assert!(store.user().is_none());
    assert!(!store.is_loading());
}

#[tokio::test]
async fn init_auth_after_completion_is_a_no_op() {
    let (store, mock) = store(MockAuth::default().with_me(Ok(user("u1"))));
    store.init_auth().await;
    let seen = watch(&store);

    store.init_auth().await;

    assert_eq!(mock.me_calls.load(Ordering::SeqCst), 1);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn loading_is_visible_while_init_is_in_flight() {
    let (store, _) = store(MockAuth::default().with_me(Ok(user("u1"))).me_delay(100));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.init_auth().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.phase(), SessionPhase::Loading);

    task.await.unwrap();
    assert_eq!(store.phase(), SessionPhase::Ready);
}

// =========================================================================
// login / register
// =========================================================================

#[tokio::test]
async fn login_success_sets_user_and_initialized() {
    let (store, _) = store(MockAuth::default().with_login(Ok(session_for("u1"))));
    let seen = watch(&store);

    store.login("u1@example.com", "pw").await.unwrap();

    assert_eq!(store.user().map(|u| u.id), Some("u1".into()));
    assert!(store.is_initialized());
    assert!(!store.is_loading());
    // start, success, finally
    assert_eq!(*seen.lock().unwrap(), vec![true, true, false]);
}

#[tokio::test]
async fn login_failure_surfaces_server_message_and_keeps_user() {
    let (store, _) = store(
        MockAuth::default()
            .with_me(Ok(user("u1")))
            .with_login(Err(auth_err("Invalid credentials"))),
    );
    store.init_auth().await;
    let seen = watch(&store);

    let failure = store.login("u1@example.com", "wrong").await.unwrap_err();

    assert_eq!(failure.message, "Invalid credentials");
    assert_eq!(failure.kind, ErrorKind::Auth);
    assert_eq!(store.user().map(|u| u.id), Some("u1".into()));
    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn login_network_failure_uses_generic_message() {
    let (store, _) = store(MockAuth::default().with_login(Err(ApiError::Network("connection refused".into()))));

    let failure = store.login("a@example.com", "pw").await.unwrap_err();

    assert_eq!(failure.message, NETWORK_FAILED);
    assert_eq!(failure.kind, ErrorKind::Network);
}

#[tokio::test]
async fn login_failure_with_empty_message_falls_back() {
    let (store, _) = store(MockAuth::default().with_login(Err(ApiError::from_status(500, "", None))));

    let failure = store.login("a@example.com", "pw").await.unwrap_err();

    assert_eq!(failure.message, LOGIN_FAILED);
}

#[tokio::test(start_paused = true)]
async fn cancelled_login_still_clears_loading() {
    let (store, _) = store(MockAuth::default().with_login(Ok(session_for("u1"))).login_delay(1_000));

    let outcome = tokio::time::timeout(Duration::from_millis(10), store.login("a@example.com", "pw")).await;

    assert!(outcome.is_err());
    assert!(!store.is_loading());
    assert!(store.user().is_none());
}

#[tokio::test]
async fn register_forwards_optional_name() {
    let (store, mock) = store(MockAuth::default());

    store.register("new@example.com", "pw", Some("Nora")).await.unwrap();

    assert_eq!(store.user().map(|u| u.id), Some("new".into()));
    assert_eq!(*mock.register_names.lock().unwrap(), vec![Some("Nora".to_owned())]);
}

#[tokio::test]
async fn register_conflict_is_a_validation_failure() {
    let (store, _) = store(MockAuth::default());

    let failure = store.register("taken@example.com", "pw", None).await.unwrap_err();

    assert_eq!(failure.kind, ErrorKind::Validation);
    assert_eq!(failure.message, "Email already registered");
    assert!(store.user().is_none());
}

// =========================================================================
// logout / refresh_user
// =========================================================================

#[tokio::test]
async fn logout_clears_user_even_when_remote_call_fails() {
    let (store, mock) = store(
        MockAuth::default()
            .with_login(Ok(session_for("u1")))
            .with_logout(Err(ApiError::from_status(500, "boom", None))),
    );
    store.login("u1@example.com", "pw").await.unwrap();
    let seen = watch(&store);

    store.logout().await;

    assert!(store.user().is_none());
    assert_eq!(mock.logout_calls.load(Ordering::SeqCst), 1);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_user_auth_rejection_clears_session() {
    let (store, _) = store(MockAuth::default().with_login(Ok(session_for("u1"))));
    store.login("u1@example.com", "pw").await.unwrap();

    store.refresh_user().await;

    assert!(store.user().is_none());
}

#[tokio::test]
async fn refresh_user_network_failure_keeps_session() {
    let (store, _) = store(
        MockAuth::default()
            .with_login(Ok(session_for("u1")))
            .with_me(Err(ApiError::Network("timeout".into()))),
    );
    store.login("u1@example.com", "pw").await.unwrap();
    let seen = watch(&store);

    store.refresh_user().await;

    assert_eq!(store.user().map(|u| u.id), Some("u1".into()));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_refresh_does_not_overwrite_newer_login() {
    let (store, _) = store(
        MockAuth::default()
            .with_me(Ok(user("stale")))
            .me_delay(100)
            .with_login(Ok(session_for("fresh"))),
    );

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.refresh_user().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.login("fresh@example.com", "pw").await.unwrap();
    slow.await.unwrap();

    assert_eq!(store.user().map(|u| u.id), Some("fresh".into()));
}

#[tokio::test(start_paused = true)]
async fn later_login_beats_slow_init() {
    let (store, _) = store(
        MockAuth::default()
            .with_me(Ok(user("old")))
            .me_delay(100)
            .with_login(Ok(session_for("new"))),
    );

    let init = tokio::spawn({
        let store = store.clone();
        async move { store.init_auth().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.login("new@example.com", "pw").await.unwrap();
    init.await.unwrap();

    assert_eq!(store.user().map(|u| u.id), Some("new".into()));
    assert!(store.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn login_overtaken_by_logout_reports_failure() {
    let (store, _) = store(MockAuth::default().with_login(Ok(session_for("u1"))).login_delay(100));

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.login("u1@example.com", "pw").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.logout().await;
    let failure = pending.await.unwrap().unwrap_err();

    assert_eq!(failure.kind, ErrorKind::Auth);
    assert_eq!(failure.message, SUPERSEDED);
    assert!(store.user().is_none());
    assert!(!store.is_loading());
}

// =========================================================================
// reset
// =========================================================================

#[tokio::test]
async fn reset_restores_fresh_state_and_allows_reinit() {
    let (store, mock) = store(MockAuth::default().with_me(Ok(user("u1"))).with_me(Ok(user("u2"))));
    store.init_auth().await;
    let seen = watch(&store);

    store.reset();
    assert_eq!(store.snapshot(), SessionSnapshot::default());

    store.init_auth().await;
    assert_eq!(mock.me_calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.user().map(|u| u.id), Some("u2".into()));
    assert!(seen.lock().unwrap().is_empty());
}
