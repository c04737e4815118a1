//! Messages exchanged between simulated nodes.
mod sequence;

pub use sequence::Sequence;

use derive_more::Display;
use tokio::sync::oneshot;

/// Index of a node within its population.
pub type NodeId = usize;

/// Run-wide freshness stamp of a message.
pub type SequenceId = u64;

/// What a message carries. Transport faults are data, not errors: a `Corrupted` payload
/// is still accepted by a node, a `Lost` payload is a delivery that never happened.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Payload {
    #[display(fmt = "")]
    Empty,
    #[display(fmt = "OK")]
    Ok,
    #[display(fmt = "corrupted")]
    Corrupted,
    #[display(fmt = "lost")]
    Lost,
}

impl Payload {
    /// Whether a node holding this payload counts as informed.
    pub fn is_accepted(&self) -> bool {
        match self {
            Payload::Ok | Payload::Corrupted => true,
            Payload::Empty | Payload::Lost => false,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Empty
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender_id: NodeId,
    pub payload: Payload,
    pub sequence_id: SequenceId,
}

impl Message {
    pub fn new(sender_id: NodeId, payload: Payload, sequence_id: SequenceId) -> Self {
        Message { sender_id, payload, sequence_id }
    }

    /// The knowledge a node starts a run with. Sequence `0` is never allocated, so any
    /// real message is fresher.
    pub fn empty(node_id: NodeId) -> Self {
        Message { sender_id: node_id, payload: Payload::Empty, sequence_id: 0 }
    }

    /// A copy of this message relayed by `sender_id`. Copies keep the sequence id.
    pub fn forwarded_by(&self, sender_id: NodeId) -> Self {
        Message { sender_id, payload: self.payload, sequence_id: self.sequence_id }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "⦑{} {:?} #{}⦒", self.sender_id, self.payload, self.sequence_id)
    }
}

/// A node's answer to a delivery which carried a reply slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub node_id: NodeId,
    /// The payload as the replying node observed it on arrival.
    pub payload: Payload,
    pub sequence_id: SequenceId,
}

/// One-shot slot a node answers into. Dropping it unanswered means "no answer".
pub type ReplySlot = oneshot::Sender<Reply>;

/// Creates a reply slot together with the receiving half the sender waits on.
pub fn reply_slot() -> (ReplySlot, oneshot::Receiver<Reply>) {
    oneshot::channel()
}
