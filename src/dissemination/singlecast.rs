use super::{originate_source, Outcome, Result, Timing};

use crate::colored::Colorize;
use crate::message::{reply_slot, Message, Payload};
use crate::network::{await_reply, join_hops, Network};
use crate::node::Population;

use tracing::{info, warn};

/// Relays the source's value along the chain `0 -> 1 -> .. -> n-1`.
///
/// Each hop is a fresh message. The next hop starts only once the current receiver
/// answered; once a receiver reports a corrupted payload, the rest of the chain relays
/// the corruption. The first hop without an answer aborts the rest of the chain.
pub(super) async fn run(population: &Population, network: &Network, timing: &Timing) -> Result<Outcome> {
    let source = originate_source(population).await?;
    let mut payload = source.payload;
    let mut hops = vec![];
    let mut replies = 0;

    for sender in 0..population.len().saturating_sub(1) {
        let receiver = population.node(sender + 1)?.clone();
        let receiver_id = receiver.id;
        let message = Message::new(sender, payload, population.sequence().next());
        population.record_send(receiver_id, &message)?;

        let (slot, answer) = reply_slot();
        hops.push(network.dispatch(receiver, message, Some(slot)));
        match await_reply(answer, timing.reply_timeout).await {
            Some(reply) => {
                replies += 1;
                if reply.payload == Payload::Corrupted && payload != Payload::Corrupted {
                    warn!("[{}] node {} observed a corrupted payload", "singlecast".cyan(), receiver_id);
                    payload = Payload::Corrupted;
                }
            }
            None => {
                warn!(
                    "[{}] no answer from node {}, chain aborted",
                    "singlecast".cyan(),
                    receiver_id
                );
                break;
            }
        }
    }

    let sent = hops.len();
    join_hops(hops).await;
    info!("[{}] completed after {} hops", "singlecast".cyan(), sent);
    Ok(Outcome { rounds: 1, hops: sent, replies })
}
