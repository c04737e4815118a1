use super::{originate_source, Outcome, Result, Timing, SOURCE};

use crate::colored::Colorize;
use crate::message::{reply_slot, Message, NodeId, Payload};
use crate::network::{await_reply, join_hops, Network};
use crate::node::{Population, Topology};

use tracing::{debug, info};

pub(super) async fn run(population: &Population, network: &Network, timing: &Timing) -> Result<Outcome> {
    let topology = Topology::full_mesh(population.len());
    let message = originate_source(population).await?;
    let peers = topology.peers(SOURCE);
    info!("[{}] node {} broadcasts {} to {} peers", "broadcast".cyan(), SOURCE, message, peers.len());

    let observed = broadcast_from(population, network, timing, &message, peers).await?;
    let replies = observed.iter().filter(|payload| **payload != Payload::Lost).count();
    info!("[{}] completed, {}/{} peers answered", "broadcast".cyan(), replies, peers.len());
    Ok(Outcome { rounds: 1, hops: peers.len(), replies })
}

/// Sends `message` from its sender to every peer in parallel, one independent hop each.
///
/// Returns, in peer order, the payload each peer reported observing, or `Lost` for peers
/// which did not answer within the reply timeout. Returns once every hop has been
/// transmitted and every reply wait has resolved; nothing is retried.
pub async fn broadcast_from(
    population: &Population,
    network: &Network,
    timing: &Timing,
    message: &Message,
    peers: &[NodeId],
) -> Result<Vec<Payload>> {
    let mut hops = vec![];
    let mut answers = vec![];
    for peer in peers.iter().filter(|peer| **peer != message.sender_id) {
        let receiver = population.node(*peer)?.clone();
        population.record_send(*peer, message)?;
        let (slot, answer) = reply_slot();
        hops.push(network.dispatch(receiver, message.clone(), Some(slot)));
        answers.push((*peer, answer));
    }

    let waits = answers.into_iter().map(|(peer, answer)| async move {
        match await_reply(answer, timing.reply_timeout).await {
            Some(reply) => reply.payload,
            None => {
                debug!("[{}] no answer from node {}", "broadcast".cyan(), peer);
                Payload::Lost
            }
        }
    });
    let observed = futures::future::join_all(waits).await;
    join_hops(hops).await;
    Ok(observed)
}
