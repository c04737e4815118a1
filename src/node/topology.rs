use super::{Error, Result};
use crate::message::NodeId;

/// Who may send to whom, as index-based peer lists over a population. Nodes never hold
/// references to each other; restricting a node's peers is a change to its list here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    peers: Vec<Vec<NodeId>>,
}

/// A multicast partition: the domain leaders and the restricted topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domains {
    pub leaders: Vec<NodeId>,
    pub topology: Topology,
}

impl Topology {
    /// Every node is a peer of every other node.
    pub fn full_mesh(node_count: usize) -> Self {
        let peers = (0..node_count)
            .map(|id| (0..node_count).filter(|peer| *peer != id).collect())
            .collect();
        Topology { peers }
    }

    /// Partitions `node_count` nodes into `domains` multicast domains.
    ///
    /// The first `domains` nodes lead. The first leader gets every other leader as a
    /// peer, then the remaining nodes are dealt round-robin to the leaders, starting
    /// with the first leader. Non-leaders have no peers.
    pub fn multicast(node_count: usize, domains: usize) -> Result<Domains> {
        if domains < 2 {
            return Err(Error::InvalidDomainCount(domains));
        }
        if domains > node_count {
            return Err(Error::InsufficientNodes { domains, nodes: node_count });
        }
        let mut peers: Vec<Vec<NodeId>> = vec![vec![]; node_count];
        let leaders: Vec<NodeId> = (0..domains).collect();
        peers[0].extend(leaders[1..].iter().cloned());
        for (i, id) in (domains..node_count).enumerate() {
            peers[leaders[i % domains]].push(id);
        }
        Ok(Domains { leaders, topology: Topology { peers } })
    }

    pub fn peers(&self, id: NodeId) -> &[NodeId] {
        match self.peers.get(id) {
            Some(peers) => peers.as_slice(),
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (id, peers) in self.peers.iter().enumerate() {
            if !peers.is_empty() {
                writeln!(f, "{} -> {:?}", id, peers)?;
            }
        }
        Ok(())
    }
}
