use std::{
    sync::{Arc, Mutex, PoisonError, Weak},
    time::Duration,
};

use tokio::{runtime::TryCurrentError, sync::watch};

use crate::{
    backend::{error::BackendError, events_monitor::SessionEventsMonitor, timeout::with_timeout},
    domain::{
        events::SessionEvent,
        status::{now_unix_ms, SessionSnapshot, StatusError},
        user::{Identity, User},
    },
    usecases::contracts::ChatBackend,
};

const SESSION_LOGIN_FAILED: &str = "SESSION_LOGIN_FAILED";
const SESSION_LOGOUT_FAILED: &str = "SESSION_LOGOUT_FAILED";

/// Owns current-user identity and presence.
///
/// Identity only changes through backend events; `login`/`logout` issue the
/// commands and track loading and failure state.
#[derive(Clone)]
pub struct SessionController {
    backend: Arc<dyn ChatBackend>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
    monitor: Arc<Mutex<Option<SessionEventsMonitor>>>,
    timeout: Duration,
}

impl SessionController {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            backend,
            snapshot: Arc::new(snapshot),
            monitor: Arc::new(Mutex::new(None)),
            timeout,
        }
    }

    /// Subscribes to backend session events. Returns `Ok(false)` if already
    /// attached, and an error outside a tokio runtime.
    pub fn attach(&self) -> Result<bool, TryCurrentError> {
        let mut monitor = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        if monitor.is_some() {
            tracing::debug!("session events already attached; ignoring duplicate subscription");
            return Ok(false);
        }

        let snapshot = Arc::downgrade(&self.snapshot);
        *monitor = Some(SessionEventsMonitor::start(
            self.backend.subscribe(),
            move |event| apply_weak(&snapshot, event),
        )?);
        Ok(true)
    }

    pub fn detach(&self) {
        let monitor = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Applies one backend event synchronously.
    pub fn apply_event(&self, event: SessionEvent) {
        apply(&self.snapshot, event);
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot.borrow().current_user.clone()
    }

    pub fn is_online(&self) -> bool {
        self.snapshot.borrow().online
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().loading
    }

    pub async fn login(&self, identity: Identity) {
        self.mutate(|snapshot| snapshot.loading = true);

        let result = with_timeout(self.timeout, self.backend.start_session(&identity)).await;

        self.mutate(|snapshot| {
            snapshot.loading = false;
            snapshot.last_error = result.as_ref().err().map(status_error);
        });

        match result {
            Ok(()) => tracing::info!(username = %identity.username, "session started"),
            Err(error) => tracing::warn!(
                code = SESSION_LOGIN_FAILED,
                error_code = error.code(),
                error = %error,
                "session start failed"
            ),
        }
    }

    /// Ends the backend session. Local identity is cleared by the backend's
    /// "current user changed" event, not here.
    pub async fn logout(&self) {
        let result = with_timeout(self.timeout, self.backend.end_session()).await;

        self.mutate(|snapshot| {
            snapshot.last_error = result.as_ref().err().map(status_error);
        });

        if let Err(error) = result {
            tracing::warn!(
                code = SESSION_LOGOUT_FAILED,
                error_code = error.code(),
                error = %error,
                "session end failed"
            );
        }
    }

    /// Waits until the backend has published a current user.
    pub async fn wait_for_user(&self, timeout: Duration) -> Option<User> {
        let mut snapshots = self.snapshot.subscribe();
        let settled = tokio::time::timeout(
            timeout,
            snapshots.wait_for(|snapshot| snapshot.current_user.is_some()),
        )
        .await;

        match settled {
            Ok(Ok(snapshot)) => snapshot.current_user.clone(),
            _ => None,
        }
    }

    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        mutate(&self.snapshot, mutator);
    }
}

fn mutate<F>(snapshot: &watch::Sender<SessionSnapshot>, mutator: F)
where
    F: FnOnce(&mut SessionSnapshot),
{
    snapshot.send_modify(|snapshot| {
        mutator(snapshot);
        snapshot.updated_at_unix_ms = now_unix_ms();
    });
}

fn apply(snapshot: &watch::Sender<SessionSnapshot>, event: SessionEvent) {
    mutate(snapshot, |snapshot| match event {
        SessionEvent::CurrentUserChanged(user) => snapshot.current_user = user,
        SessionEvent::CurrentUserOnline => snapshot.online = true,
        SessionEvent::CurrentUserOffline => snapshot.online = false,
    });
}

fn apply_weak(snapshot: &Weak<watch::Sender<SessionSnapshot>>, event: SessionEvent) {
    if let Some(snapshot) = snapshot.upgrade() {
        apply(&snapshot, event);
    }
}

fn status_error(error: &BackendError) -> StatusError {
    StatusError {
        code: error.code().to_owned(),
        at_unix_ms: now_unix_ms(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{alice, seeded_backend, settle};

    fn controller() -> (Arc<crate::backend::memory::InMemoryBackend>, SessionController) {
        let backend = Arc::new(seeded_backend());
        let controller = SessionController::new(backend.clone(), Duration::from_secs(1));
        (backend, controller)
    }

    #[test]
    fn initial_snapshot_is_signed_out_and_offline() {
        let (_, controller) = controller();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.current_user, None);
        assert!(!snapshot.online);
        assert!(!snapshot.loading);
        assert!(snapshot.last_error.is_none());
    }

    #[test]
    fn events_update_state_in_delivery_order() {
        let (_, controller) = controller();

        controller.apply_event(SessionEvent::CurrentUserChanged(Some(alice())));
        controller.apply_event(SessionEvent::CurrentUserOnline);
        controller.apply_event(SessionEvent::CurrentUserOffline);

        assert_eq!(controller.current_user(), Some(alice()));
        assert!(!controller.is_online());
    }

    #[test]
    fn subscribers_observe_the_current_snapshot_first() {
        let (_, controller) = controller();
        controller.apply_event(SessionEvent::CurrentUserOnline);

        let receiver = controller.subscribe();

        assert!(receiver.borrow().online);
    }

    #[tokio::test]
    async fn login_publishes_user_and_presence_from_backend_events() {
        let (_, controller) = controller();
        assert!(controller.attach().expect("attach inside runtime"));

        controller.login(Identity::new("alice")).await;
        let user = controller.wait_for_user(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(user, Some(alice()));
        assert!(controller.is_online());
        assert!(!controller.is_loading());
        assert!(controller.snapshot().last_error.is_none());
    }

    #[tokio::test]
    async fn loading_is_set_for_the_duration_of_login() {
        let (backend, controller) = controller();
        backend.set_latency(Duration::from_millis(20));

        let login = controller.login(Identity::new("alice"));
        tokio::pin!(login);
        assert!(futures::poll!(&mut login).is_pending());
        assert!(controller.is_loading());

        login.await;
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn failed_login_records_error_code_without_identity() {
        let (_, controller) = controller();
        controller.attach().expect("attach inside runtime");

        controller.login(Identity::new("mallory")).await;
        settle().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.current_user, None);
        assert!(!snapshot.loading);
        assert_eq!(
            snapshot.last_error.map(|error| error.code),
            Some("BACKEND_UNAUTHORIZED".to_owned())
        );
    }

    #[tokio::test]
    async fn logout_leaves_identity_to_backend_events() {
        let (_, controller) = controller();
        controller.apply_event(SessionEvent::CurrentUserChanged(Some(alice())));

        controller.logout().await;

        assert_eq!(
            controller.current_user(),
            Some(alice()),
            "without an attached event stream nothing clears the identity"
        );
    }

    #[tokio::test]
    async fn logout_clears_identity_once_backend_reports_it() {
        let (_, controller) = controller();
        controller.attach().expect("attach inside runtime");
        controller.login(Identity::new("alice")).await;
        controller.wait_for_user(Duration::from_secs(1)).await;

        controller.logout().await;
        settle().await;

        assert_eq!(controller.current_user(), None);
        assert!(!controller.is_online());
    }

    #[tokio::test]
    async fn attach_subscribes_only_once() {
        let (backend, controller) = controller();

        assert!(controller.attach().expect("attach inside runtime"));
        assert!(!controller.clone().attach().expect("attach inside runtime"));
        assert_eq!(backend.event_subscriber_count(), 1);

        controller.detach();
        settle().await;
        assert!(!controller.is_attached());
        assert_eq!(backend.event_subscriber_count(), 0);
    }
}
