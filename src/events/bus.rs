//! EventBus - Fan-out of engine events to observers
//!
//! Comparison and coverage runs publish here without waiting on anyone. The
//! channel is a `tokio::sync::broadcast`, so a receiver that falls behind
//! loses the oldest events rather than slowing the run down.

use super::EngineEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Slots reserved on top of the per-record events of a run
const RUN_HEADROOM: usize = 64;

/// Broadcast channel shared by the orchestrator, analyzers and observers.
///
/// Cloning is cheap and every clone publishes into the same channel. The
/// channel closes once the last clone is dropped, which ends observer loops.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<EngineEvent>>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Size a bus so one run over `records` inputs cannot lag a receiver
    /// that is only drained after the run.
    ///
    /// Each record yields at most two events (a classification or coverage
    /// event plus a skip or gap), and a run adds a few lifecycle events.
    pub fn for_run(records: usize) -> Self {
        Self::new(records.saturating_mul(2).saturating_add(RUN_HEADROOM))
    }

    /// Publish an event. Dropped silently when nobody is subscribed.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Publish an event built lazily, only when someone is listening
    pub fn emit_with(&self, make: impl FnOnce() -> EngineEvent) {
        if self.sender.receiver_count() > 0 {
            let _ = self.sender.send(make());
        }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::MatchStatus;

    #[test]
    fn test_clones_publish_into_one_channel() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let clone = bus.clone();
        assert_eq!(clone.subscriber_count(), 1);

        clone.emit(EngineEvent::comparison_started(1, 1));
        assert_eq!(rx.try_recv().unwrap().event_type(), "ComparisonStarted");
    }

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        bus.emit(EngineEvent::comparison_started(1, 1));

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_with_skips_construction_without_subscribers() {
        let bus = EventBus::new(10);
        let mut built = false;
        bus.emit_with(|| {
            built = true;
            EngineEvent::comparison_started(0, 0)
        });
        assert!(!built);

        let _rx = bus.subscribe();
        bus.emit_with(|| {
            built = true;
            EngineEvent::comparison_started(0, 0)
        });
        assert!(built);
    }

    #[test]
    fn test_for_run_holds_a_full_run_without_lag() {
        let records = 50;
        let bus = EventBus::for_run(records);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::comparison_started(records, records));
        for i in 0..2 * records {
            bus.emit(EngineEvent::candidate_classified(
                &format!("C-{}", i),
                MatchStatus::NewCase,
                0.0,
                None,
                0,
            ));
        }
        bus.emit(EngineEvent::comparison_completed(records, 0, 0, records, 0, 0, 1));

        let mut received = 0;
        while let Ok(_event) = rx.try_recv() {
            received += 1;
        }
        assert_eq!(received, 2 * records + 2);
    }

    #[test]
    fn test_small_bus_lags_slow_receiver() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..5 {
            bus.emit(EngineEvent::comparison_started(i, 0));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
        match rx.try_recv().unwrap() {
            EngineEvent::ComparisonStarted { candidates, .. } => assert_eq!(candidates, 3),
            other => panic!("Wrong event type: {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_events_arrive_in_emit_order() {
        let bus = EventBus::new(600);
        let mut rx = bus.subscribe();

        for i in 0..500 {
            bus.emit(EngineEvent::comparison_started(i, 0));
        }

        for i in 0..500 {
            match rx.recv().await.unwrap() {
                EngineEvent::ComparisonStarted { candidates, .. } => assert_eq!(candidates, i),
                other => panic!("Wrong event type: {}", other.event_type()),
            }
        }
    }
}
