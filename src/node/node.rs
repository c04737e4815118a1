use crate::audit::{AuditEvent, AuditLog};
use crate::colored::Colorize;
use crate::message::{Message, NodeId, Payload, Reply, ReplySlot};

use actix::{Actor, ActorContext, Context, Handler};
use tracing::{debug, trace};

/// A simulated participant. Its mailbox is the actix mailbox; every handler runs to
/// completion before the next message is taken, so deliveries never race on
/// `knowledge`.
pub struct Node {
    id: NodeId,
    /// Fixed for the lifetime of the run.
    alive: bool,
    experiment_id: u64,
    /// The most recently accepted message.
    knowledge: Message,
    /// This node's audit handle.
    audit: AuditLog,
    /// Set once the run deadline expired under the `discard` late effects policy.
    retired: bool,
}

impl Node {
    pub fn new(id: NodeId, alive: bool, experiment_id: u64, audit: AuditLog) -> Self {
        Node { id, alive, experiment_id, knowledge: Message::empty(id), audit, retired: false }
    }

    /// Freshness rule: only a strictly newer sequence id replaces the knowledge.
    fn accept(&mut self, message: &Message) -> bool {
        if message.sequence_id > self.knowledge.sequence_id {
            self.knowledge = message.clone();
            true
        } else {
            false
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot { node_id: self.id, alive: self.alive, knowledge: self.knowledge.clone() }
    }
}

impl Actor for Node {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        trace!("node {} started (alive = {})", self.id, self.alive);
    }

    fn stopped(&mut self, _ctx: &mut Context<Self>) {
        trace!("node {} stopped", self.id);
    }
}

/// Delivers a message into the node's mailbox, optionally expecting a reply.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct Deliver {
    pub message: Message,
    pub reply: Option<ReplySlot>,
}

impl Handler<Deliver> for Node {
    type Result = ();

    fn handle(&mut self, msg: Deliver, _ctx: &mut Context<Self>) -> Self::Result {
        let Deliver { message, reply } = msg;
        self.audit.record(AuditEvent::receive(
            self.experiment_id,
            self.id,
            self.alive,
            &message,
            &self.knowledge,
        ));

        // Dead and retired nodes stay silent: dropping `reply` resolves the sender's
        // wait as "no answer".
        if !self.alive {
            debug!("[{}] node {} is dead, ignoring {}", "node".red(), self.id, message);
            return;
        }
        if self.retired {
            debug!("[{}] node {} is retired, discarding {}", "node".red(), self.id, message);
            return;
        }
        if message.payload == Payload::Lost {
            debug!("[{}] node {} did not receive {}", "node".red(), self.id, message);
            return;
        }

        if self.accept(&message) {
            debug!("[{}] node {} accepted {}", "node".green(), self.id, message);
        } else {
            debug!(
                "[{}] node {} ignored stale {} (holds #{})",
                "node".yellow(),
                self.id,
                message,
                self.knowledge.sequence_id
            );
        }

        if let Some(reply) = reply {
            let _ = reply.send(Reply {
                node_id: self.id,
                payload: message.payload,
                sequence_id: message.sequence_id,
            });
        }
    }
}

/// Makes the node the origin of `message`. Dead nodes never originate and answer
/// `false`.
#[derive(Debug, Clone, Message)]
#[rtype(result = "bool")]
pub struct Originate {
    pub message: Message,
}

impl Handler<Originate> for Node {
    type Result = bool;

    fn handle(&mut self, msg: Originate, _ctx: &mut Context<Self>) -> Self::Result {
        if !self.alive {
            return false;
        }
        self.accept(&msg.message)
    }
}

/// The node records that it sent `message` to `receiver_id`.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct RecordSend {
    pub receiver_id: NodeId,
    pub message: Message,
}

impl Handler<RecordSend> for Node {
    type Result = ();

    fn handle(&mut self, msg: RecordSend, _ctx: &mut Context<Self>) -> Self::Result {
        self.audit.record(AuditEvent::send(
            self.experiment_id,
            msg.receiver_id,
            self.alive,
            &msg.message,
            &self.knowledge,
        ));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, MessageResponse)]
pub struct Snapshot {
    pub node_id: NodeId,
    pub alive: bool,
    pub knowledge: Message,
}

impl Snapshot {
    /// Alive and holding an accepted payload.
    pub fn is_informed(&self) -> bool {
        self.alive && self.knowledge.payload.is_accepted()
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Snapshot")]
pub struct Inspect;

impl Handler<Inspect> for Node {
    type Result = Snapshot;

    fn handle(&mut self, _msg: Inspect, _ctx: &mut Context<Self>) -> Self::Result {
        self.snapshot()
    }
}

/// Freezes the node's knowledge; later deliveries are recorded but never applied.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Retire;

impl Handler<Retire> for Node {
    type Result = ();

    fn handle(&mut self, _msg: Retire, _ctx: &mut Context<Self>) -> Self::Result {
        self.retired = true;
    }
}

/// Stops the actor at the run boundary.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Shutdown;

impl Handler<Shutdown> for Node {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Context<Self>) -> Self::Result {
        ctx.stop();
    }
}
