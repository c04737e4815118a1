use super::{Error, Result, Storage};

use derive_more::Display;
use tai64::Tai64N;

const RUNS: &str = "runs";

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    /// The run deadline expired before the strategy completed.
    Expired,
    /// The strategy refused to start, e.g. because of a dead source.
    #[display(fmt = "not run")]
    NotRun,
    /// The run broke off with an error.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub experiment_id: u64,
    pub algorithm: String,
    pub started: Tai64N,
    pub finished: Option<Tai64N>,
    pub status: RunStatus,
    pub rounds: usize,
}

fn key(experiment_id: u64, algorithm: &str) -> String {
    format!("{}/{}", experiment_id, algorithm)
}

/// Registers the start of a run, replacing any earlier record of the same run.
pub fn mark_run_start(storage: &Storage, experiment_id: u64, algorithm: &str) -> Result<RunRecord> {
    let record = RunRecord {
        experiment_id,
        algorithm: algorithm.to_owned(),
        started: Tai64N::now(),
        finished: None,
        status: RunStatus::Running,
        rounds: 0,
    };
    let tree = storage.db().open_tree(RUNS)?;
    let _ = tree.insert(key(experiment_id, algorithm), bincode::serialize(&record)?)?;
    Ok(record)
}

/// Closes a run registered with [`mark_run_start`].
pub fn mark_run_end(
    storage: &Storage,
    experiment_id: u64,
    algorithm: &str,
    status: RunStatus,
    rounds: usize,
) -> Result<RunRecord> {
    let mut record = get_run(storage, experiment_id, algorithm)?;
    record.finished = Some(Tai64N::now());
    record.status = status;
    record.rounds = rounds;
    let tree = storage.db().open_tree(RUNS)?;
    let _ = tree.insert(key(experiment_id, algorithm), bincode::serialize(&record)?)?;
    Ok(record)
}

pub fn get_run(storage: &Storage, experiment_id: u64, algorithm: &str) -> Result<RunRecord> {
    let tree = storage.db().open_tree(RUNS)?;
    let k = key(experiment_id, algorithm);
    match tree.get(&k)? {
        Some(v) => Ok(bincode::deserialize(v.as_ref())?),
        None => Err(Error::UnknownRun(k)),
    }
}

/// Every run of one experiment, ordered by algorithm name.
pub fn get_runs(storage: &Storage, experiment_id: u64) -> Result<Vec<RunRecord>> {
    let tree = storage.db().open_tree(RUNS)?;
    let mut runs = vec![];
    for kv in tree.scan_prefix(format!("{}/", experiment_id)) {
        let (_k, v) = kv?;
        runs.push(bincode::deserialize(v.as_ref())?);
    }
    Ok(runs)
}
