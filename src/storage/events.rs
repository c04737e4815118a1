use super::{Result, Storage};

use crate::audit::{AuditEvent, Recorder};
use crate::colored::Colorize;

use tracing::error;

/// Name of the event tree for one algorithm, e.g. `events/GossipPush`.
pub fn tree_name(algorithm: &str) -> String {
    format!("events/{}", algorithm)
}

/// Appends `event` to `tree`, keyed by a database-wide unique id in big-endian order so
/// that iteration follows insertion.
pub fn insert_event(db: &sled::Db, tree: &sled::Tree, event: &AuditEvent) -> Result<u64> {
    let id = db.generate_id()?;
    let encoded = bincode::serialize(event)?;
    let _ = tree.insert(id.to_be_bytes(), encoded)?;
    Ok(id)
}

/// All events recorded for `algorithm`, in recording order.
pub fn get_events(storage: &Storage, algorithm: &str) -> Result<Vec<AuditEvent>> {
    let tree = storage.db().open_tree(tree_name(algorithm))?;
    let mut events = vec![];
    for kv in tree.iter() {
        let (_k, v) = kv?;
        events.push(bincode::deserialize(v.as_ref())?);
    }
    Ok(events)
}

/// Events of one experiment recorded for `algorithm`.
pub fn get_experiment_events(
    storage: &Storage,
    experiment_id: u64,
    algorithm: &str,
) -> Result<Vec<AuditEvent>> {
    let events = get_events(storage, algorithm)?;
    Ok(events.into_iter().filter(|e| e.experiment_id == experiment_id).collect())
}

/// Persists audit events into the event tree of one algorithm.
#[derive(Clone)]
pub struct TreeRecorder {
    db: sled::Db,
    tree: sled::Tree,
}

impl TreeRecorder {
    pub fn new(storage: &Storage, algorithm: &str) -> Result<Self> {
        let tree = storage.db().open_tree(tree_name(algorithm))?;
        Ok(TreeRecorder { db: storage.db().clone(), tree })
    }
}

impl Recorder for TreeRecorder {
    fn record(&self, event: AuditEvent) {
        if let Err(err) = insert_event(&self.db, &self.tree, &event) {
            error!("[{}] failed to record {:?}: {}", "audit".red(), event.kind, err);
        }
    }
}
