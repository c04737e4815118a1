use crate::message::NodeId;

use rand::Rng;

#[cfg(test)]
use std::collections::HashSet;
use std::convert::TryFrom;
use std::time::Duration;

/// The fate of one hop, decided when it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub delay: Duration,
    pub corrupted: bool,
    pub lost: bool,
}

/// Transport fidelity of the links between nodes.
pub trait Link: Send + Sync {
    fn sample(&self, sender: NodeId, receiver: NodeId) -> Hop;
}

/// Every link delays uniformly in `[0, 2 × mean_delay)`, then corrupts and loses with
/// independent probabilities.
#[derive(Debug, Clone)]
pub struct RandomLink {
    pub mean_delay: Duration,
    pub loss_probability: f64,
    pub corruption_probability: f64,
}

impl RandomLink {
    pub fn new(mean_delay: Duration, loss_probability: f64, corruption_probability: f64) -> Self {
        RandomLink { mean_delay, loss_probability, corruption_probability }
    }
}

impl Link for RandomLink {
    fn sample(&self, _sender: NodeId, _receiver: NodeId) -> Hop {
        let mut rng = rand::thread_rng();
        let bound =
            u64::try_from(self.mean_delay.as_micros().saturating_mul(2)).unwrap_or(u64::MAX);
        let delay = if bound == 0 {
            Duration::from_micros(0)
        } else {
            Duration::from_micros(rng.gen_range(0, bound))
        };
        let corrupted = rng.gen_bool(self.corruption_probability);
        let lost = rng.gen_bool(self.loss_probability);
        Hop { delay, corrupted, lost }
    }
}

/// Fixed delay everywhere, with faults forced on chosen `(sender, receiver)` links.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink {
    delay: Duration,
    corrupt: HashSet<(NodeId, NodeId)>,
    lose: HashSet<(NodeId, NodeId)>,
}

#[cfg(test)]
impl ScriptedLink {
    pub fn new(delay: Duration) -> Self {
        ScriptedLink { delay, corrupt: HashSet::new(), lose: HashSet::new() }
    }

    pub fn corrupt(mut self, sender: NodeId, receiver: NodeId) -> Self {
        let _ = self.corrupt.insert((sender, receiver));
        self
    }

    pub fn lose(mut self, sender: NodeId, receiver: NodeId) -> Self {
        let _ = self.lose.insert((sender, receiver));
        self
    }
}

#[cfg(test)]
impl Link for ScriptedLink {
    fn sample(&self, sender: NodeId, receiver: NodeId) -> Hop {
        Hop {
            delay: self.delay,
            corrupted: self.corrupt.contains(&(sender, receiver)),
            lost: self.lose.contains(&(sender, receiver)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_random_delay_bounds() {
        let link = RandomLink::new(Duration::from_millis(5), 0.0, 0.0);
        for _ in 0..500 {
            let hop = link.sample(0, 1);
            assert!(hop.delay < Duration::from_millis(10));
            assert!(!hop.corrupted);
            assert!(!hop.lost);
        }
    }

    #[actix_rt::test]
    async fn test_zero_mean_delay_is_instant() {
        let link = RandomLink::new(Duration::from_millis(0), 1.0, 1.0);
        let hop = link.sample(0, 1);
        assert_eq!(hop.delay, Duration::from_micros(0));
        assert!(hop.corrupted);
        assert!(hop.lost);
    }

    #[actix_rt::test]
    async fn test_huge_mean_delay_does_not_overflow() {
        let link = RandomLink::new(Duration::from_millis(u64::MAX), 0.0, 0.0);
        for _ in 0..100 {
            assert!(link.sample(0, 1).delay < Duration::from_micros(u64::MAX));
        }
    }

    #[actix_rt::test]
    async fn test_fault_rates_are_roughly_respected() {
        let link = RandomLink::new(Duration::from_millis(1), 0.25, 0.5);
        let samples: Vec<Hop> = (0..4000).map(|_| link.sample(0, 1)).collect();
        let lost = samples.iter().filter(|h| h.lost).count();
        let corrupted = samples.iter().filter(|h| h.corrupted).count();
        assert!(lost > 800 && lost < 1200, "lost {}", lost);
        assert!(corrupted > 1700 && corrupted < 2300, "corrupted {}", corrupted);
    }

    #[actix_rt::test]
    async fn test_scripted_faults_are_directional() {
        let link = ScriptedLink::new(Duration::from_millis(2)).corrupt(1, 2).lose(3, 0);
        assert!(link.sample(1, 2).corrupted);
        assert!(!link.sample(2, 1).corrupted);
        assert!(link.sample(3, 0).lost);
        assert!(!link.sample(0, 3).lost);
        assert_eq!(link.sample(5, 6).delay, Duration::from_millis(2));
    }
}
