use super::{Error, Result};
use super::{Deliver, Inspect, Node, Originate, RecordSend, Retire, Shutdown, Snapshot};

use crate::audit::AuditLog;
use crate::message::{Message, NodeId, Payload, Sequence};

use actix::{Actor, Addr};
use rand::Rng;
use tracing::debug;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Samples one independent alive flag per node.
pub fn sample_alive(node_count: usize, alive_probability: f64) -> Vec<bool> {
    let mut rng = rand::thread_rng();
    (0..node_count).map(|_| rng.gen_bool(alive_probability)).collect()
}

#[derive(Clone)]
pub struct NodeHandle {
    pub id: NodeId,
    pub alive: bool,
    pub addr: Addr<Node>,
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).field("alive", &self.alive).finish()
    }
}

/// All nodes of one run together with the run's sequence and round counters. Created
/// fresh for every dissemination run and shut down afterwards.
pub struct Population {
    experiment_id: u64,
    nodes: Vec<NodeHandle>,
    sequence: Sequence,
    rounds: Arc<AtomicUsize>,
}

impl Population {
    /// Starts one node actor per entry of `alive_mask`, each with its own clone of the
    /// audit handle. Must be called from within a running actix system.
    pub fn spawn(experiment_id: u64, alive_mask: &[bool], audit: AuditLog) -> Self {
        let nodes = alive_mask
            .iter()
            .enumerate()
            .map(|(id, alive)| {
                let addr = Node::new(id, *alive, experiment_id, audit.clone()).start();
                NodeHandle { id, alive: *alive, addr }
            })
            .collect::<Vec<_>>();
        debug!("spawned {} nodes", nodes.len());
        Population {
            experiment_id,
            nodes,
            sequence: Sequence::new(),
            rounds: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn experiment_id(&self) -> u64 {
        self.experiment_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeHandle> {
        self.nodes.get(id).ok_or(Error::UnknownNode(id))
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Counts one more round of the run and returns the new total.
    pub fn begin_round(&self) -> usize {
        self.rounds.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Rounds begun so far. Still readable after the strategy itself was abandoned.
    pub fn rounds(&self) -> usize {
        self.rounds.load(Ordering::SeqCst)
    }

    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Makes `id` the origin of a fresh `payload`. Returns `None` for a dead node, which
    /// never originates.
    pub async fn originate(&self, id: NodeId, payload: Payload) -> Result<Option<Message>> {
        let node = self.node(id)?;
        if !node.alive {
            return Ok(None);
        }
        let message = Message::new(id, payload, self.sequence.next());
        let accepted = node.addr.send(Originate { message: message.clone() }).await?;
        Ok(if accepted { Some(message) } else { None })
    }

    /// Has the sender of `message` record that it sent it to `receiver_id`.
    pub fn record_send(&self, receiver_id: NodeId, message: &Message) -> Result<()> {
        let sender = self.node(message.sender_id)?;
        sender.addr.do_send(RecordSend { receiver_id, message: message.clone() });
        Ok(())
    }

    pub async fn knowledge(&self, id: NodeId) -> Result<Message> {
        let Snapshot { knowledge, .. } = self.node(id)?.addr.send(Inspect).await?;
        Ok(knowledge)
    }

    /// Snapshots every node, in id order. Each snapshot is taken after the node has
    /// processed everything already in its mailbox.
    pub async fn snapshot(&self) -> Result<Vec<Snapshot>> {
        let inspections = self.nodes.iter().map(|node| node.addr.send(Inspect));
        let mut snapshots = vec![];
        for result in futures::future::join_all(inspections).await {
            snapshots.push(result?);
        }
        Ok(snapshots)
    }

    /// Freezes the knowledge of every node.
    pub async fn retire(&self) -> Result<()> {
        let retirements = self.nodes.iter().map(|node| node.addr.send(Retire));
        for result in futures::future::join_all(retirements).await {
            let () = result?;
        }
        Ok(())
    }

    /// Delivers `message` to `id` directly, bypassing the network.
    #[cfg(test)]
    pub fn deliver(&self, id: NodeId, message: Message) -> Result<()> {
        self.node(id)?.addr.do_send(Deliver { message, reply: None });
        Ok(())
    }

    /// Stops every node actor. Deliveries still in flight are dropped.
    pub fn shutdown(&self) {
        for node in self.nodes.iter() {
            node.addr.do_send(Shutdown);
        }
    }
}
