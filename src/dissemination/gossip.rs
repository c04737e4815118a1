use super::{originate_source, Error, Outcome, Result, Timing};

use crate::colored::Colorize;
use crate::message::{reply_slot, Message, NodeId, Reply};
use crate::network::{await_reply, join_hops, Network};
use crate::node::{Population, RecordSend, Snapshot, Topology};

use derive_more::Display;
use rand::seq::SliceRandom;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GossipMode {
    /// Informed nodes push their knowledge to a random peer.
    Push,
    /// Nodes hand their knowledge to a random peer that is still uninformed.
    Pull,
    /// Both sides of an exchange send their knowledge to each other.
    PushPull,
}

/// One gossip contact planned for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub initiator: NodeId,
    pub peer: NodeId,
}

/// Plans one round from the round-start `snapshots`: every alive node contacts `fanout`
/// peers drawn uniformly (with replacement) from its peer list. Dead nodes initiate
/// nothing but may be picked as peers.
pub fn plan_round(snapshots: &[Snapshot], topology: &Topology, fanout: usize) -> Vec<Exchange> {
    let mut rng = rand::thread_rng();
    let mut exchanges = vec![];
    for snapshot in snapshots.iter().filter(|s| s.alive) {
        let peers = topology.peers(snapshot.node_id);
        for _ in 0..fanout {
            if let Some(peer) = peers.choose(&mut rng) {
                exchanges.push(Exchange { initiator: snapshot.node_id, peer: *peer });
            }
        }
    }
    exchanges
}

/// The work in flight for one round: hop tasks to join and replies to collect.
#[derive(Default)]
struct Round {
    hops: Vec<JoinHandle<()>>,
    answers: Vec<(NodeId, oneshot::Receiver<Reply>)>,
}

impl Round {
    /// Records and dispatches `message` to `receiver_id` right away.
    fn send(
        &mut self,
        population: &Population,
        network: &Network,
        receiver_id: NodeId,
        message: Message,
    ) -> Result<()> {
        let receiver = population.node(receiver_id)?.clone();
        population.record_send(receiver_id, &message)?;
        let (slot, answer) = reply_slot();
        self.hops.push(network.dispatch(receiver, message, Some(slot)));
        self.answers.push((receiver_id, answer));
        Ok(())
    }

    /// A paced exchange in both directions. The reverse half is skipped for a dead peer.
    fn exchange(
        &mut self,
        population: &Population,
        network: &Network,
        timing: &Timing,
        forward: Message,
        reverse: Option<Message>,
        peer: NodeId,
    ) -> Result<()> {
        let initiator = population.node(forward.sender_id)?.clone();
        let responder = population.node(peer)?.clone();
        let (forward_slot, forward_answer) = reply_slot();
        self.answers.push((responder.id, forward_answer));
        let reverse = match reverse {
            Some(message) => {
                let (slot, answer) = reply_slot();
                self.answers.push((initiator.id, answer));
                Some((message, slot))
            }
            None => None,
        };

        let network = network.clone();
        let pacing = timing.pacing;
        self.hops.push(tokio::spawn(async move {
            let mut hops = vec![];
            sleep(pacing).await;
            initiator.addr.do_send(RecordSend {
                receiver_id: responder.id,
                message: forward.clone(),
            });
            hops.push(network.dispatch(responder.clone(), forward, Some(forward_slot)));
            if let Some((message, slot)) = reverse {
                sleep(pacing).await;
                responder.addr.do_send(RecordSend {
                    receiver_id: initiator.id,
                    message: message.clone(),
                });
                hops.push(network.dispatch(initiator, message, Some(slot)));
            }
            join_hops(hops).await;
        }));
        Ok(())
    }

    /// Barrier: waits for every transmit, then for the replies within the timeout.
    /// Returns `(hops, replies)`.
    async fn finish(self, timing: &Timing) -> (usize, usize) {
        let Round { hops, answers } = self;
        join_hops(hops).await;
        let sent = answers.len();
        let waits = answers.into_iter().map(|(peer, answer)| async move {
            let reply = await_reply(answer, timing.reply_timeout).await;
            if reply.is_none() {
                debug!("[{}] no answer from node {}", "gossip".cyan(), peer);
            }
            reply.is_some()
        });
        let replies = futures::future::join_all(waits).await.into_iter().filter(|r| *r).count();
        (sent, replies)
    }
}

/// Gossips the source's value in synchronous rounds until every alive node is informed.
pub(super) async fn run(
    population: &Population,
    network: &Network,
    timing: &Timing,
    mode: GossipMode,
    fanout: usize,
) -> Result<Outcome> {
    if fanout == 0 {
        return Err(Error::InvalidFanout(fanout));
    }
    let topology = Topology::full_mesh(population.len());
    let source = originate_source(population).await?;
    info!("[{}] {} from {} with fanout {}", "gossip".cyan(), mode, source, fanout);

    let alive = population.alive_count();
    let mut outcome = Outcome::default();
    loop {
        let snapshots = population.snapshot().await?;
        let informed = snapshots.iter().filter(|s| s.is_informed()).count();
        info!(
            "[{}] round {}: {}/{} alive nodes informed",
            "gossip".cyan(),
            outcome.rounds,
            informed,
            alive
        );
        if informed >= alive {
            break;
        }
        outcome.rounds = population.begin_round();

        let mut round = Round::default();
        for Exchange { initiator, peer } in plan_round(&snapshots, &topology, fanout) {
            let own = &snapshots[initiator];
            let theirs = &snapshots[peer];
            let forward = own.knowledge.forwarded_by(initiator);
            match mode {
                GossipMode::Push => {
                    if own.knowledge.payload.is_accepted() {
                        round.send(population, network, peer, forward)?;
                    }
                }
                GossipMode::Pull => {
                    if !theirs.knowledge.payload.is_accepted() {
                        round.send(population, network, peer, forward)?;
                    }
                }
                GossipMode::PushPull => {
                    let reverse = if theirs.alive {
                        Some(theirs.knowledge.forwarded_by(peer))
                    } else {
                        None
                    };
                    round.exchange(population, network, timing, forward, reverse, peer)?;
                }
            }
        }
        let (hops, replies) = round.finish(timing).await;
        debug!("[{}] round {} sent {} hops, {} answered", "gossip".cyan(), outcome.rounds, hops, replies);
        outcome.hops += hops;
        outcome.replies += replies;
    }

    info!("[{}] {} converged after {} rounds", "gossip".cyan(), mode, outcome.rounds);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::audit::{EventKind, MemoryRecorder, Silent};
    use crate::message::Payload;
    use crate::network::ScriptedLink;

    use std::sync::Arc;
    use std::time::Duration;

    fn scripted(delay_ms: u64) -> Network {
        Network::new(Arc::new(ScriptedLink::new(Duration::from_millis(delay_ms))))
    }

    fn fast_timing() -> Timing {
        Timing { pacing: Duration::from_millis(1), ..Timing::default() }
    }

    #[actix_rt::test]
    async fn test_every_mode_converges_without_faults() {
        for mode in [GossipMode::Push, GossipMode::Pull, GossipMode::PushPull].iter() {
            let population = Population::spawn(0, &[true; 12], Arc::new(Silent));
            let outcome = run(&population, &scripted(1), &fast_timing(), *mode, 2).await.unwrap();
            assert!(outcome.rounds >= 1, "{}", mode);

            let snapshots = population.snapshot().await.unwrap();
            assert!(snapshots.iter().all(|s| s.is_informed()), "{}", mode);
            // Every copy is a forward of the source's message.
            assert!(snapshots.iter().all(|s| s.knowledge.sequence_id == 1), "{}", mode);
            population.shutdown();
        }
    }

    #[actix_rt::test]
    async fn test_push_converges_within_bound() {
        let population = Population::spawn(0, &[true; 10], Arc::new(Silent));
        let outcome =
            run(&population, &scripted(1), &Timing::default(), GossipMode::Push, 1).await.unwrap();
        assert!(outcome.rounds >= 1);
        assert!(outcome.rounds < 60, "took {} rounds", outcome.rounds);
        assert_eq!(outcome.rounds, population.rounds());
        assert_eq!(outcome.replies, outcome.hops);
    }

    #[actix_rt::test]
    async fn test_dead_nodes_are_not_waited_for() {
        let mask = [true, false, true, true, false, true, false, true];
        let population = Population::spawn(0, &mask, Arc::new(Silent));
        let _ = run(&population, &scripted(1), &fast_timing(), GossipMode::PushPull, 1)
            .await
            .unwrap();

        let snapshots = population.snapshot().await.unwrap();
        for snapshot in snapshots.iter() {
            assert_eq!(snapshot.is_informed(), snapshot.alive);
            if !snapshot.alive {
                assert_eq!(snapshot.knowledge.payload, Payload::Empty);
            }
        }
    }

    #[actix_rt::test]
    async fn test_rounds_survive_an_abandoned_run() {
        let population = Population::spawn(0, &[true; 5], Arc::new(Silent));
        let mut link = ScriptedLink::new(Duration::from_millis(1));
        for peer in 1..5 {
            link = link.lose(0, peer);
        }
        let network = Network::new(Arc::new(link));
        let timing = fast_timing();
        let gossip = run(&population, &network, &timing, GossipMode::Push, 1);
        assert!(tokio::time::timeout(Duration::from_millis(400), gossip).await.is_err());
        assert!(population.rounds() >= 2, "counted {} rounds", population.rounds());
        population.shutdown();
    }

    #[actix_rt::test]
    async fn test_single_node_needs_no_round() {
        let population = Population::spawn(0, &[true], Arc::new(Silent));
        let outcome =
            run(&population, &scripted(1), &Timing::default(), GossipMode::Pull, 3).await.unwrap();
        assert_eq!(outcome, Outcome::default());
    }

    #[actix_rt::test]
    async fn test_zero_fanout_is_rejected() {
        let recorder = MemoryRecorder::new();
        let population = Population::spawn(0, &[true; 4], Arc::new(recorder.clone()));
        match run(&population, &scripted(1), &Timing::default(), GossipMode::Push, 0).await {
            Err(Error::InvalidFanout(0)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(population.sequence().last(), 0);
        let _ = population.snapshot().await.unwrap();
        assert!(recorder.events().is_empty());
    }

    #[actix_rt::test]
    async fn test_push_pull_audits_both_directions() {
        let recorder = MemoryRecorder::new();
        let population = Population::spawn(0, &[true, true], Arc::new(recorder.clone()));
        let outcome = run(&population, &scripted(1), &fast_timing(), GossipMode::PushPull, 1)
            .await
            .unwrap();
        assert_eq!(outcome.rounds, 1);
        let _ = population.snapshot().await.unwrap();

        let events = recorder.events();
        let sends: Vec<_> = events.iter().filter(|e| e.kind == EventKind::Send).collect();
        // Both nodes initiate one exchange each, two hops apiece.
        assert_eq!(sends.len(), 4);
        assert!(sends.iter().any(|e| e.sender_id == 0 && e.receiver_id == 1));
        assert!(sends.iter().any(|e| e.sender_id == 1 && e.receiver_id == 0));
    }

    #[actix_rt::test]
    async fn test_plan_round_skips_dead_initiators() {
        let population = Population::spawn(0, &[true, false, true, true], Arc::new(Silent));
        let snapshots = population.snapshot().await.unwrap();
        let topology = Topology::full_mesh(4);

        let exchanges = plan_round(&snapshots, &topology, 3);
        assert_eq!(exchanges.len(), 9);
        assert!(exchanges.iter().all(|e| e.initiator != 1));
        assert!(exchanges.iter().all(|e| e.initiator != e.peer));
    }
}
