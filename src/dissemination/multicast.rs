use super::broadcast::broadcast_from;
use super::{originate_source, Outcome, Result, Timing, SOURCE};

use crate::colored::Colorize;
use crate::message::{Message, Payload};
use crate::network::Network;
use crate::node::{Domains, Population, Topology};

use tracing::{debug, info};

/// Two-level broadcast. The first leader broadcasts to the other leaders and its own
/// domain; every other leader then broadcasts into its domain whatever it was observed
/// to receive, so faults on the inter-domain hop carry into the domain.
pub(super) async fn run(
    population: &Population,
    network: &Network,
    timing: &Timing,
    domains: usize,
) -> Result<Outcome> {
    let Domains { leaders, topology } = Topology::multicast(population.len(), domains)?;
    debug!("[{}] domains\n{}", "multicast".cyan(), topology);

    let root = originate_source(population).await?;
    let root_peers = topology.peers(SOURCE);
    info!("[{}] leader {} broadcasts {}", "multicast".cyan(), SOURCE, root);
    let observed = broadcast_from(population, network, timing, &root, root_peers).await?;
    let mut hops = root_peers.len();
    let mut replies = count_replies(&observed);

    // The other leaders are the first peers of the root, in order.
    for (leader, payload) in leaders[1..].iter().zip(observed.iter()) {
        if !population.node(*leader)?.alive {
            debug!("[{}] leader {} is dead, its domain stays dark", "multicast".cyan(), leader);
            continue;
        }
        let message = Message::new(*leader, *payload, population.sequence().next());
        let peers = topology.peers(*leader);
        info!("[{}] leader {} broadcasts {} to {} peers", "multicast".cyan(), leader, message, peers.len());
        let observed = broadcast_from(population, network, timing, &message, peers).await?;
        hops += peers.len();
        replies += count_replies(&observed);
    }

    info!("[{}] completed, {}/{} hops answered", "multicast".cyan(), replies, hops);
    Ok(Outcome { rounds: domains, hops, replies })
}

fn count_replies(observed: &[Payload]) -> usize {
    observed.iter().filter(|payload| **payload != Payload::Lost).count()
}
