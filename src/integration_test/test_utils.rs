use crate::network::{Network, ScriptedLink};
use crate::settings::Experiment;
use crate::simulation::Coordinator;
use crate::storage::Storage;

use std::sync::Arc;
use std::time::Duration;

pub const HOP_DELAY: Duration = Duration::from_millis(1);

pub fn scripted(link: ScriptedLink) -> Network {
    Network::new(Arc::new(link))
}

pub fn fault_free() -> Network {
    scripted(ScriptedLink::new(HOP_DELAY))
}

/// A small fast experiment with the given id and node count.
pub fn experiment(id: u64, node_count: usize) -> Experiment {
    Experiment {
        id,
        node_count,
        multicast_domains: 2,
        gossip_fanout: 2,
        mean_delay_ms: 1,
        pacing_ms: 1,
        loss_probability: 0.0,
        corruption_probability: 0.0,
        ..Experiment::default()
    }
}

/// A coordinator over a temporary database, returned with a handle to that database.
pub fn coordinator(experiment: Experiment, network: Network, alive_mask: Vec<bool>) -> (Coordinator, Storage) {
    let storage = Storage::temporary().unwrap();
    let coordinator = Coordinator::with_network(experiment, storage.clone(), network, alive_mask);
    (coordinator, storage)
}
