use tokio::{
    runtime::{Handle, TryCurrentError},
    sync::{broadcast, watch},
};

use crate::domain::events::SessionEvent;

const SESSION_EVENTS_MONITOR_STARTED: &str = "BACKEND_SESSION_EVENTS_MONITOR_STARTED";
const SESSION_EVENTS_MONITOR_STOPPED: &str = "BACKEND_SESSION_EVENTS_MONITOR_STOPPED";
const SESSION_EVENTS_MONITOR_LAGGED: &str = "BACKEND_SESSION_EVENTS_MONITOR_LAGGED";
const SESSION_EVENTS_MONITOR_STOP_SIGNALLED: &str = "BACKEND_SESSION_EVENTS_MONITOR_STOP_SIGNALLED";

/// Background task applying backend session events in delivery order.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct SessionEventsMonitor {
    stop_tx: Option<watch::Sender<bool>>,
}

impl SessionEventsMonitor {
    /// Spawns the monitor on the current tokio runtime.
    ///
    /// Fails when called outside a runtime.
    pub fn start<F>(
        events: broadcast::Receiver<SessionEvent>,
        on_event: F,
    ) -> Result<Self, TryCurrentError>
    where
        F: Fn(SessionEvent) + Send + 'static,
    {
        let runtime = Handle::try_current()?;
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(run_monitor(events, stop_rx, on_event));

        tracing::info!(
            code = SESSION_EVENTS_MONITOR_STARTED,
            "session events monitor started"
        );

        Ok(Self {
            stop_tx: Some(stop_tx),
        })
    }

    pub fn stop(mut self) {
        self.signal_stop();
    }

    fn signal_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::debug!(
                code = SESSION_EVENTS_MONITOR_STOP_SIGNALLED,
                "session events monitor stop signal sent"
            );
        }
    }
}

impl Drop for SessionEventsMonitor {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

async fn run_monitor<F>(
    mut events: broadcast::Receiver<SessionEvent>,
    mut stop_rx: watch::Receiver<bool>,
    on_event: F,
) where
    F: Fn(SessionEvent),
{
    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::info!(
                        code = SESSION_EVENTS_MONITOR_STOPPED,
                        "session events monitor stopped"
                    );
                    return;
                }
            }
            received = events.recv() => {
                match received {
                    Ok(event) => {
                        tracing::debug!(event_kind = event.kind(), "session event observed");
                        on_event(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            code = SESSION_EVENTS_MONITOR_LAGGED,
                            skipped,
                            "session events monitor fell behind; keeping monitor alive"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(
                            code = SESSION_EVENTS_MONITOR_STOPPED,
                            "session event stream closed"
                        );
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[tokio::test]
    async fn applies_events_in_emission_order() {
        let (tx, rx) = broadcast::channel(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let monitor = SessionEventsMonitor::start(rx, move |event| {
            sink.lock().expect("sink lock").push(event.kind());
        })
        .expect("monitor should start inside a runtime");

        tx.send(SessionEvent::CurrentUserOnline).expect("send");
        tx.send(SessionEvent::CurrentUserOffline).expect("send");
        tx.send(SessionEvent::CurrentUserChanged(None)).expect("send");
        drop(tx);

        for _ in 0..50 {
            if seen.lock().expect("seen lock").len() == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        monitor.stop();

        assert_eq!(
            *seen.lock().expect("seen lock"),
            vec![
                "current_user_online",
                "current_user_offline",
                "current_user_cleared"
            ]
        );
    }

    #[tokio::test]
    async fn stopped_monitor_ignores_later_events() {
        let (tx, rx) = broadcast::channel(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let monitor = SessionEventsMonitor::start(rx, move |event| {
            sink.lock().expect("sink lock").push(event.kind());
        })
        .expect("monitor should start inside a runtime");

        monitor.stop();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let _ = tx.send(SessionEvent::CurrentUserOnline);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(seen.lock().expect("seen lock").is_empty());
    }

    #[test]
    fn start_outside_a_runtime_is_an_error() {
        let (_tx, rx) = broadcast::channel(8);

        let result = SessionEventsMonitor::start(rx, |_| {});

        assert!(result.is_err());
    }
}
