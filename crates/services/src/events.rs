use lift_core::model::{Workout, WorkoutId};
use tokio::sync::broadcast;

pub(crate) const EVENT_CAPACITY: usize = 64;

/// Changes other components can react to.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkoutEvent {
    WorkoutCreated { id: WorkoutId },
    WorkoutUpdated { id: WorkoutId },
    /// A live session was logged; carries the persisted workout.
    SessionFinished { workout: Workout },
    LogDeleted { id: WorkoutId },
    PlanDeleted { id: WorkoutId },
    /// A value inside a live session changed.
    ExerciseUpdated { exercise: String, index: usize },
}

/// Fan-out channel for `WorkoutEvent`s.
///
/// Publishing never blocks; subscribers that fall behind by more than the
/// channel capacity observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    event_tx: broadcast::Sender<WorkoutEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { event_tx: tx }
    }

    /// Publish an event and return how many subscribers received it.
    pub fn publish(&self, event: WorkoutEvent) -> usize {
        match self.event_tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(?event, "no subscribers for workout event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkoutEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(WorkoutEvent::PlanDeleted { id: WorkoutId::new(1) }), 0);

        let mut rx = bus.subscribe();
        let other = bus.clone();
        assert_eq!(other.publish(WorkoutEvent::LogDeleted { id: WorkoutId::new(2) }), 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            WorkoutEvent::LogDeleted { id: WorkoutId::new(2) }
        );
    }
}
