use crate::analysis::{self, Summary};
use crate::audit::AuditLog;
use crate::colored::Colorize;
use crate::dissemination::{self, GossipMode, Outcome, Strategy, Timing};
use crate::network::Network;
use crate::node::{sample_alive, Population};
use crate::settings::{Experiment, LateEffects};
use crate::storage::runs::{self, RunStatus};
use crate::storage::{events, experiments, Storage};
use crate::Result;

use tokio::time::timeout;
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

use std::sync::Arc;
use std::time::Duration;

/// How a strategy invocation ended.
#[derive(Debug)]
pub enum Completion {
    Finished(Outcome),
    /// The deadline expired first; the strategy was abandoned after the given rounds.
    Expired(usize),
    /// The strategy refused to start.
    NotRun(dissemination::Error),
}

impl Completion {
    pub fn status(&self) -> RunStatus {
        match self {
            Completion::Finished(_) => RunStatus::Finished,
            Completion::Expired(_) => RunStatus::Expired,
            Completion::NotRun(_) => RunStatus::NotRun,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Completion::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Rounds executed before the strategy returned or was abandoned.
    pub fn rounds(&self) -> usize {
        match self {
            Completion::Finished(outcome) => outcome.rounds,
            Completion::Expired(rounds) => *rounds,
            Completion::NotRun(_) => 0,
        }
    }
}

/// Everything known about one finished run.
#[derive(Debug)]
pub struct RunReport {
    pub strategy: Strategy,
    pub completion: Completion,
    pub summary: Summary,
}

/// Drives `strategy` over `population` until it completes or `deadline` expires.
///
/// On expiry hops already in flight keep running. Under [`LateEffects::Discard`] every
/// node is retired before returning, so nothing arriving later changes knowledge.
pub async fn drive(
    strategy: Strategy,
    population: &Population,
    network: &Network,
    timing: &Timing,
    deadline: Option<Duration>,
    late_effects: LateEffects,
) -> Result<Completion> {
    let run = dissemination::run(strategy, population, network, timing);
    let result = match deadline {
        Some(limit) => match timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[{}] {} deadline of {:?} expired", "simulation".magenta(), strategy, limit);
                if late_effects == LateEffects::Discard {
                    population.retire().await?;
                }
                return Ok(Completion::Expired(population.rounds()));
            }
        },
        None => run.await,
    };
    match result {
        Ok(outcome) => Ok(Completion::Finished(outcome)),
        Err(err) if err.is_configuration() => {
            warn!("[{}] {} not run: {}", "simulation".magenta(), strategy, err);
            Ok(Completion::NotRun(err))
        }
        Err(err) => Err(err.into()),
    }
}

/// Runs every strategy of one experiment against the same alive mask, recording audit
/// events, run records and summaries into `storage`.
pub struct Coordinator {
    experiment: Experiment,
    storage: Storage,
    network: Network,
    alive_mask: Vec<bool>,
}

impl Coordinator {
    /// Validates `experiment` and samples its alive mask once, for all strategies.
    pub fn new(experiment: Experiment, storage: Storage) -> Result<Self> {
        experiment.validate()?;
        let network = Network::random(
            experiment.mean_delay(),
            experiment.loss_probability,
            experiment.corruption_probability,
        );
        let alive_mask = sample_alive(experiment.node_count, experiment.alive_probability);
        Ok(Coordinator { experiment, storage, network, alive_mask })
    }

    /// A coordinator with a fixed network and alive mask.
    #[cfg(test)]
    pub fn with_network(
        experiment: Experiment,
        storage: Storage,
        network: Network,
        alive_mask: Vec<bool>,
    ) -> Self {
        Coordinator { experiment, storage, network, alive_mask }
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn alive_mask(&self) -> &[bool] {
        &self.alive_mask
    }

    /// The strategies of an experiment, in the order they run.
    pub fn strategies(&self) -> Vec<Strategy> {
        let fanout = self.experiment.gossip_fanout;
        vec![
            Strategy::Broadcast,
            Strategy::Singlecast,
            Strategy::Multicast { domains: self.experiment.multicast_domains },
            Strategy::Gossip { mode: GossipMode::Pull, fanout },
            Strategy::Gossip { mode: GossipMode::Push, fanout },
            Strategy::Gossip { mode: GossipMode::PushPull, fanout },
        ]
    }

    /// Stores the experiment, then runs every strategy one after the other.
    pub async fn run_all(&self) -> Result<Vec<RunReport>> {
        experiments::insert_experiment(&self.storage, &self.experiment)?;
        let mut reports = vec![];
        for strategy in self.strategies() {
            reports.push(self.run(strategy).await?);
        }
        self.storage.flush()?;
        Ok(reports)
    }

    /// One run: a fresh population, a registry entry, the strategy itself, then the
    /// summary taken from the state at completion (or expiry).
    pub async fn run(&self, strategy: Strategy) -> Result<RunReport> {
        let algorithm = strategy.to_string();
        let experiment_id = self.experiment.id;
        let span = info_span!("run", experiment = experiment_id, algorithm = %algorithm);
        self.execute(strategy, algorithm).instrument(span).await
    }

    async fn execute(&self, strategy: Strategy, algorithm: String) -> Result<RunReport> {
        let experiment_id = self.experiment.id;
        let recorder: AuditLog = Arc::new(events::TreeRecorder::new(&self.storage, &algorithm)?);
        let record = runs::mark_run_start(&self.storage, experiment_id, &algorithm)?;
        let population = Population::spawn(experiment_id, &self.alive_mask, recorder);
        info!(
            "[{}] {} over {} nodes ({} alive)",
            "simulation".magenta(),
            algorithm,
            population.len(),
            population.alive_count()
        );

        let driven = drive(
            strategy,
            &population,
            &self.network,
            &self.experiment.timing(),
            self.experiment.deadline(),
            self.experiment.late_effects,
        )
        .await;
        let snapshots = match &driven {
            Ok(_) => population.snapshot().await,
            Err(_) => Ok(vec![]),
        };
        population.shutdown();
        let completion = self.settle(&algorithm, driven)?;
        let snapshots = self.settle(&algorithm, snapshots)?;

        let rounds = analysis::rounds(strategy, completion.rounds());
        let _ = runs::mark_run_end(
            &self.storage,
            experiment_id,
            &algorithm,
            completion.status(),
            rounds,
        )?;

        let events = events::get_experiment_events(&self.storage, experiment_id, &algorithm)?
            .into_iter()
            .filter(|e| e.timestamp >= record.started)
            .collect::<Vec<_>>();
        let summary = analysis::summarize(
            experiment_id,
            &algorithm,
            record.started,
            &events,
            &snapshots,
            rounds,
            matches!(completion, Completion::Expired(_)),
        );
        experiments::insert_summary(&self.storage, &summary)?;
        info!("[{}] {} {}", "simulation".magenta(), completion.status(), summary);

        Ok(RunReport { strategy, completion, summary })
    }

    /// Closes the registry entry of a run that broke off with an error, then hands the
    /// error back.
    fn settle<T, E>(&self, algorithm: &str, result: std::result::Result<T, E>) -> Result<T>
    where
        E: Into<crate::Error>,
    {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let err: crate::Error = err.into();
                error!("[{}] {} failed: {}", "simulation".magenta(), algorithm, err);
                let _ = runs::mark_run_end(
                    &self.storage,
                    self.experiment.id,
                    algorithm,
                    RunStatus::Failed,
                    0,
                )?;
                Err(err)
            }
        }
    }
}
