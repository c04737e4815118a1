//! Per-message audit trail. Every send and every receive of a run produces one
//! [`AuditEvent`], handed to a [`Recorder`] owned by the node which observed it.
use crate::message::{Message, NodeId, Payload, SequenceId};

use derive_more::Display;
use tai64::Tai64N;

use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Send,
    Receive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub experiment_id: u64,
    pub timestamp: Tai64N,
    /// The node which recorded the event.
    pub node_id: NodeId,
    pub alive: bool,
    pub sender_id: NodeId,
    pub receiver_id: NodeId,
    pub payload: Payload,
    pub sequence_id: SequenceId,
    /// The recording node's knowledge at the time of the event.
    pub knowledge: Payload,
    pub kind: EventKind,
}

impl AuditEvent {
    /// A `Receive` event as seen by `receiver_id` on arrival of `message`.
    pub fn receive(
        experiment_id: u64,
        receiver_id: NodeId,
        alive: bool,
        message: &Message,
        knowledge: &Message,
    ) -> Self {
        AuditEvent {
            experiment_id,
            timestamp: Tai64N::now(),
            node_id: receiver_id,
            alive,
            sender_id: message.sender_id,
            receiver_id,
            payload: message.payload,
            sequence_id: message.sequence_id,
            knowledge: knowledge.payload,
            kind: EventKind::Receive,
        }
    }

    /// A `Send` event as seen by the sender of `message`.
    pub fn send(
        experiment_id: u64,
        receiver_id: NodeId,
        alive: bool,
        message: &Message,
        knowledge: &Message,
    ) -> Self {
        AuditEvent {
            experiment_id,
            timestamp: Tai64N::now(),
            node_id: message.sender_id,
            alive,
            sender_id: message.sender_id,
            receiver_id,
            payload: message.payload,
            sequence_id: message.sequence_id,
            knowledge: knowledge.payload,
            kind: EventKind::Send,
        }
    }
}

/// Sink for audit events. Implementations must return quickly; failures are logged by
/// the implementation and never surface to the recording actor.
pub trait Recorder: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Shared handle to a recorder.
pub type AuditLog = Arc<dyn Recorder>;

/// Drops every event.
#[cfg(test)]
pub struct Silent;

#[cfg(test)]
impl Recorder for Silent {
    fn record(&self, _event: AuditEvent) {}
}

/// Keeps events in memory, in recording order.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

#[cfg(test)]
impl MemoryRecorder {
    pub fn new() -> Self {
        MemoryRecorder { events: Arc::new(Mutex::new(vec![])) }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
impl Recorder for MemoryRecorder {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        let knowledge = Message::empty(1);
        let first = Message::new(0, Payload::Ok, 1);
        let second = Message::new(0, Payload::Corrupted, 2);
        recorder.record(AuditEvent::send(3, 1, true, &first, &knowledge));
        recorder.record(AuditEvent::receive(3, 1, true, &second, &knowledge));

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Send);
        assert_eq!(events[0].node_id, 0);
        assert_eq!(events[0].receiver_id, 1);
        assert_eq!(events[1].kind, EventKind::Receive);
        assert_eq!(events[1].node_id, 1);
        assert_eq!(events[1].payload, Payload::Corrupted);
        assert_eq!(events[1].experiment_id, 3);
    }
}
