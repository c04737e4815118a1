//! Dissemination strategies. Each strategy spreads one `OK` value from the source node
//! (node `0`) through a population and returns once its completion rule is met.
mod broadcast;
mod gossip;
mod multicast;
mod singlecast;

pub use broadcast::broadcast_from;
pub use gossip::{plan_round, Exchange, GossipMode};

use crate::message::{Message, NodeId, Payload};
use crate::network::Network;
use crate::node::{self, Population};

use derive_more::Display;

use std::time::Duration;

/// The node every strategy starts from.
pub const SOURCE: NodeId = 0;

/// How long a sender waits for an answer before counting it as "no answer".
pub const REPLY_TIMEOUT: Duration = Duration::from_millis(50);

/// Pause before each half of a push-pull exchange.
pub const PUSH_PULL_PACING: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub enum Error {
    Node(node::Error),
    /// The source node is dead, and dead nodes never originate.
    DeadSource(NodeId),
    EmptyPopulation,
    /// Gossip needs to contact at least one peer per round.
    InvalidFanout(usize),
}

impl Error {
    /// Configuration errors abort a strategy before any node interaction.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::DeadSource(_) | Error::EmptyPopulation | Error::InvalidFanout(_) => true,
            Error::Node(node::Error::InvalidDomainCount(_))
            | Error::Node(node::Error::InsufficientNodes { .. }) => true,
            Error::Node(_) => false,
        }
    }
}

impl std::error::Error for Error {}

impl std::convert::From<node::Error> for Error {
    fn from(error: node::Error) -> Self {
        Error::Node(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Broadcast,
    Singlecast,
    #[display(fmt = "Multicast")]
    Multicast { domains: usize },
    #[display(fmt = "Gossip{}", mode)]
    Gossip { mode: GossipMode, fanout: usize },
}

/// Timeouts and pacing shared by all strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub reply_timeout: Duration,
    pub pacing: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing { reply_timeout: REPLY_TIMEOUT, pacing: PUSH_PULL_PACING }
    }
}

/// What a finished strategy reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// `1` for Broadcast and Singlecast, the domain count for Multicast, executed rounds
    /// for Gossip.
    pub rounds: usize,
    /// Hops put on the wire.
    pub hops: usize,
    /// Replies received before their timeout.
    pub replies: usize,
}

/// Runs `strategy` over `population` to completion.
pub async fn run(
    strategy: Strategy,
    population: &Population,
    network: &Network,
    timing: &Timing,
) -> Result<Outcome> {
    if population.is_empty() {
        return Err(Error::EmptyPopulation);
    }
    match strategy {
        Strategy::Broadcast => broadcast::run(population, network, timing).await,
        Strategy::Singlecast => singlecast::run(population, network, timing).await,
        Strategy::Multicast { domains } => {
            multicast::run(population, network, timing, domains).await
        }
        Strategy::Gossip { mode, fanout } => {
            gossip::run(population, network, timing, mode, fanout).await
        }
    }
}

/// Gives the source a fresh `OK` to spread.
async fn originate_source(population: &Population) -> Result<Message> {
    match population.originate(SOURCE, Payload::Ok).await? {
        Some(message) => Ok(message),
        None => Err(Error::DeadSource(SOURCE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::audit::Silent;
    use crate::network::ScriptedLink;

    use std::sync::Arc;

    #[actix_rt::test]
    async fn test_strategy_names() {
        assert_eq!(format!("{}", Strategy::Broadcast), "Broadcast");
        assert_eq!(format!("{}", Strategy::Multicast { domains: 3 }), "Multicast");
        let push_pull = Strategy::Gossip { mode: GossipMode::PushPull, fanout: 2 };
        assert_eq!(format!("{}", push_pull), "GossipPushPull");
    }

    #[actix_rt::test]
    async fn test_dead_source_is_not_run() {
        let population = Population::spawn(0, &[false, true, true], Arc::new(Silent));
        let network = Network::new(Arc::new(ScriptedLink::new(Duration::from_millis(1))));
        let strategies = vec![
            Strategy::Broadcast,
            Strategy::Singlecast,
            Strategy::Multicast { domains: 2 },
            Strategy::Gossip { mode: GossipMode::Push, fanout: 1 },
        ];
        for strategy in strategies {
            match run(strategy, &population, &network, &Timing::default()).await {
                Err(err) => assert!(err.is_configuration(), "{}", err),
                Ok(outcome) => panic!("{} ran: {:?}", strategy, outcome),
            }
        }
        assert_eq!(population.sequence().last(), 0);
    }

    #[actix_rt::test]
    async fn test_empty_population_is_not_run() {
        let population = Population::spawn(0, &[], Arc::new(Silent));
        let network = Network::new(Arc::new(ScriptedLink::new(Duration::from_millis(1))));
        match run(Strategy::Broadcast, &population, &network, &Timing::default()).await {
            Err(Error::EmptyPopulation) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
