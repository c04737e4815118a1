use super::{Error, Result, Storage};

use crate::analysis::Summary;
use crate::settings::Experiment;

const EXPERIMENTS: &str = "experiments";
const SUMMARIES: &str = "summaries";

/// Stores the configuration an experiment ran with.
pub fn insert_experiment(storage: &Storage, experiment: &Experiment) -> Result<()> {
    let tree = storage.db().open_tree(EXPERIMENTS)?;
    let _ = tree.insert(experiment.id.to_be_bytes(), bincode::serialize(experiment)?)?;
    Ok(())
}

pub fn get_experiment(storage: &Storage, id: u64) -> Result<Experiment> {
    let tree = storage.db().open_tree(EXPERIMENTS)?;
    match tree.get(id.to_be_bytes())? {
        Some(v) => Ok(bincode::deserialize(v.as_ref())?),
        None => Err(Error::UnknownExperiment(id)),
    }
}

/// Stores a run summary, keyed `"<experiment>/<algorithm>"`.
pub fn insert_summary(storage: &Storage, summary: &Summary) -> Result<()> {
    let tree = storage.db().open_tree(SUMMARIES)?;
    let key = format!("{}/{}", summary.experiment_id, summary.algorithm);
    let _ = tree.insert(key, bincode::serialize(summary)?)?;
    Ok(())
}

/// All summaries of one experiment, ordered by algorithm name.
pub fn get_summaries(storage: &Storage, experiment_id: u64) -> Result<Vec<Summary>> {
    let tree = storage.db().open_tree(SUMMARIES)?;
    let mut summaries = vec![];
    for kv in tree.scan_prefix(format!("{}/", experiment_id)) {
        let (_k, v) = kv?;
        summaries.push(bincode::deserialize(v.as_ref())?);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::summarize;
    use crate::settings::LateEffects;

    use tai64::Tai64N;

    #[actix_rt::test]
    async fn test_experiment_round_trip() {
        let storage = Storage::temporary().unwrap();
        let experiment =
            Experiment { id: 12, node_count: 40, late_effects: LateEffects::Discard, ..Experiment::default() };
        insert_experiment(&storage, &experiment).unwrap();
        assert_eq!(get_experiment(&storage, 12).unwrap(), experiment);

        match get_experiment(&storage, 13) {
            Err(Error::UnknownExperiment(13)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn test_summaries_are_scoped_by_experiment() {
        let storage = Storage::temporary().unwrap();
        for (experiment_id, algorithm) in [(3, "Broadcast"), (3, "GossipPull"), (4, "Broadcast")].iter() {
            let summary = summarize(*experiment_id, algorithm, Tai64N::now(), &[], &[], 1, false);
            insert_summary(&storage, &summary).unwrap();
        }

        let summaries = get_summaries(&storage, 3).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].algorithm, "GossipPull");
        assert!(summaries.iter().all(|s| s.experiment_id == 3));
    }
}
