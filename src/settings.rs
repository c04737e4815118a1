use crate::dissemination::Timing;

use config::{Config, ConfigError, Environment, File};
use derive_more::Display;

use std::time::Duration;

/// Prefix of the environment variables overriding experiment settings,
/// e.g. `DISSEMINATION_NODE_COUNT=50`.
const ENV_PREFIX: &str = "DISSEMINATION";

#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    InvalidProbability { name: &'static str, value: f64 },
    InvalidNodeCount(usize),
}

impl std::error::Error for Error {}

impl std::convert::From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Error::Config(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What happens to hops still in flight when the run deadline expires.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateEffects {
    /// Late hops may still change knowledge until the population is shut down.
    #[display(fmt = "land")]
    Land,
    /// Every node is retired on expiry; later deliveries are recorded but not applied.
    #[display(fmt = "discard")]
    Discard,
}

impl std::str::FromStr for LateEffects {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "land" => Ok(LateEffects::Land),
            "discard" => Ok(LateEffects::Discard),
            other => Err(format!("unknown late effects policy '{}'", other)),
        }
    }
}

/// Parameters of one experiment. Read once before any strategy runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experiment {
    pub id: u64,
    /// Per-run deadline in seconds, `0` for none.
    pub deadline_secs: u64,
    pub node_count: usize,
    pub multicast_domains: usize,
    pub gossip_fanout: usize,
    /// Mean one-hop delay in milliseconds.
    pub mean_delay_ms: u64,
    pub alive_probability: f64,
    pub loss_probability: f64,
    pub corruption_probability: f64,
    pub late_effects: LateEffects,
    pub reply_timeout_ms: u64,
    pub pacing_ms: u64,
}

impl Default for Experiment {
    fn default() -> Self {
        Experiment {
            id: 0,
            deadline_secs: 0,
            node_count: 10,
            multicast_domains: 3,
            gossip_fanout: 1,
            mean_delay_ms: 20,
            alive_probability: 1.0,
            loss_probability: 0.03,
            corruption_probability: 0.05,
            late_effects: LateEffects::Land,
            reply_timeout_ms: 50,
            pacing_ms: 10,
        }
    }
}

impl Experiment {
    /// Loads the defaults, then the optional configuration file, then `DISSEMINATION_*`
    /// environment variables. The result is not validated yet.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let experiment = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(experiment)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(Error::InvalidNodeCount(self.node_count));
        }
        let probabilities = [
            ("alive_probability", self.alive_probability),
            ("loss_probability", self.loss_probability),
            ("corruption_probability", self.corruption_probability),
        ];
        for (name, value) in probabilities.iter() {
            if !(0.0..=1.0).contains(value) {
                return Err(Error::InvalidProbability { name: *name, value: *value });
            }
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        if self.deadline_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.deadline_secs))
        }
    }

    pub fn mean_delay(&self) -> Duration {
        Duration::from_millis(self.mean_delay_ms)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
            pacing: Duration::from_millis(self.pacing_ms),
        }
    }
}
