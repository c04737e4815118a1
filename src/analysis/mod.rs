//! Per-run statistics computed from the audit trail and the final node snapshots.
use crate::audit::{AuditEvent, EventKind};
use crate::dissemination::Strategy;
use crate::message::{NodeId, Payload};
use crate::node::Snapshot;

use tai64::Tai64N;

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub experiment_id: u64,
    pub algorithm: String,
    /// From the start of the run to its last recorded event.
    pub duration: Duration,
    pub rounds: usize,
    pub total_messages: usize,
    pub max_sent_from_node: usize,
    pub max_received_by_node: usize,
    pub ok_count: usize,
    pub corrupted_count: usize,
    /// Nodes holding nothing at the end count as lost.
    pub lost_count: usize,
    pub ok_percentage: f64,
    pub corrupted_percentage: f64,
    pub lost_percentage: f64,
    pub alive_count: usize,
    pub dead_count: usize,
    pub deadline_expired: bool,
}

/// Rounds reported for a run: one for the single-shot strategies, the domain count for
/// multicast, and the `executed` rounds for gossip, whether or not it converged.
pub fn rounds(strategy: Strategy, executed: usize) -> usize {
    match strategy {
        Strategy::Broadcast | Strategy::Singlecast => 1,
        Strategy::Multicast { domains } => domains,
        Strategy::Gossip { .. } => executed,
    }
}

fn largest_count<I: Iterator<Item = NodeId>>(ids: I) -> usize {
    let mut counts: HashMap<NodeId, usize> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts.values().cloned().max().unwrap_or(0)
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Summarizes one run of `algorithm` which started at `started`.
pub fn summarize(
    experiment_id: u64,
    algorithm: &str,
    started: Tai64N,
    events: &[AuditEvent],
    snapshots: &[Snapshot],
    rounds: usize,
    deadline_expired: bool,
) -> Summary {
    let sends = events.iter().filter(|e| e.kind == EventKind::Send).count();
    let receives = events.len() - sends;

    let last = events.iter().map(|e| e.timestamp).max();
    let duration = match last {
        Some(last) => last.duration_since(&started).unwrap_or_default(),
        None => Duration::default(),
    };

    let mut ok_count = 0;
    let mut corrupted_count = 0;
    let mut lost_count = 0;
    for snapshot in snapshots.iter() {
        match snapshot.knowledge.payload {
            Payload::Ok => ok_count += 1,
            Payload::Corrupted => corrupted_count += 1,
            Payload::Lost | Payload::Empty => lost_count += 1,
        }
    }
    let node_count = snapshots.len();
    let alive_count = snapshots.iter().filter(|s| s.alive).count();

    Summary {
        experiment_id,
        algorithm: algorithm.to_owned(),
        duration,
        rounds,
        total_messages: sends.max(receives),
        max_sent_from_node: largest_count(
            events.iter().filter(|e| e.kind == EventKind::Send).map(|e| e.sender_id),
        ),
        max_received_by_node: largest_count(
            events.iter().filter(|e| e.kind == EventKind::Receive).map(|e| e.receiver_id),
        ),
        ok_count,
        corrupted_count,
        lost_count,
        ok_percentage: percentage(ok_count, node_count),
        corrupted_percentage: percentage(corrupted_count, node_count),
        lost_percentage: percentage(lost_count, node_count),
        alive_count,
        dead_count: node_count - alive_count,
        deadline_expired,
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} #{}: {:?}, {} rounds, {} messages (max sent {}, max received {}), \
             ok {} ({:.1}%), corrupted {} ({:.1}%), lost {} ({:.1}%), alive {}, dead {}{}",
            self.algorithm,
            self.experiment_id,
            self.duration,
            self.rounds,
            self.total_messages,
            self.max_sent_from_node,
            self.max_received_by_node,
            self.ok_count,
            self.ok_percentage,
            self.corrupted_count,
            self.corrupted_percentage,
            self.lost_count,
            self.lost_percentage,
            self.alive_count,
            self.dead_count,
            if self.deadline_expired { ", deadline expired" } else { "" }
        )
    }
}
