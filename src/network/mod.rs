//! One-hop transport between simulated nodes: delay, corruption, loss, delivery.
mod link;

pub use link::*;

use crate::message::{Message, Payload, Reply, ReplySlot};
use crate::node::{Deliver, NodeHandle};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{error, trace};

use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Network {
    link: Arc<dyn Link>,
}

impl Network {
    pub fn new(link: Arc<dyn Link>) -> Self {
        Network { link }
    }

    pub fn random(mean_delay: Duration, loss_probability: f64, corruption_probability: f64) -> Self {
        Network::new(Arc::new(RandomLink::new(mean_delay, loss_probability, corruption_probability)))
    }

    /// Moves `message` from its sender to `receiver` over one simulated hop.
    ///
    /// Corruption is applied before loss, so a lost hop stays lost. Completion only
    /// means the message reached the receiver's mailbox (or the receiver is gone);
    /// what arrived is for the receiver to interpret.
    pub async fn transmit(&self, receiver: NodeHandle, mut message: Message, reply: Option<ReplySlot>) {
        let hop = self.link.sample(message.sender_id, receiver.id);
        sleep(hop.delay).await;
        if hop.corrupted {
            message.payload = Payload::Corrupted;
        }
        if hop.lost {
            message.payload = Payload::Lost;
        }
        trace!("{} -> {} {} after {:?}", message.sender_id, receiver.id, message, hop.delay);
        receiver.addr.do_send(Deliver { message, reply });
    }

    /// Runs `transmit` as its own task. The hop keeps going even if the caller gives up.
    pub fn dispatch(
        &self,
        receiver: NodeHandle,
        message: Message,
        reply: Option<ReplySlot>,
    ) -> JoinHandle<()> {
        let network = self.clone();
        tokio::spawn(async move { network.transmit(receiver, message, reply).await })
    }
}

/// Waits until every dispatched hop has been transmitted.
pub async fn join_hops(hops: Vec<JoinHandle<()>>) {
    for result in futures::future::join_all(hops).await {
        if let Err(err) = result {
            error!("hop task failed: {:?}", err);
        }
    }
}

/// Waits up to `limit` for an answer. Timeouts and unanswered slots are both `None`.
pub async fn await_reply(answer: oneshot::Receiver<Reply>, limit: Duration) -> Option<Reply> {
    match timeout(limit, answer).await {
        Ok(Ok(reply)) => Some(reply),
        Ok(Err(_)) | Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::audit::Silent;
    use crate::message::reply_slot;
    use crate::node::Population;

    use std::time::Instant;

    fn scripted(link: ScriptedLink) -> Network {
        Network::new(Arc::new(link))
    }

    #[actix_rt::test]
    async fn test_transmit_delivers_after_delay() {
        let population = Population::spawn(0, &[true, true], Arc::new(Silent));
        let network = scripted(ScriptedLink::new(Duration::from_millis(30)));
        let receiver = population.node(1).unwrap().clone();

        let started = Instant::now();
        network.transmit(receiver, Message::new(0, Payload::Ok, 1), None).await;
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(population.knowledge(1).await.unwrap().payload, Payload::Ok);
    }

    #[actix_rt::test]
    async fn test_loss_overrides_corruption() {
        let population = Population::spawn(0, &[true, true], Arc::new(Silent));
        let link = ScriptedLink::new(Duration::from_millis(1)).corrupt(0, 1).lose(0, 1);
        let network = scripted(link);
        let receiver = population.node(1).unwrap().clone();

        let (slot, answer) = reply_slot();
        network.transmit(receiver, Message::new(0, Payload::Ok, 1), Some(slot)).await;
        assert!(await_reply(answer, Duration::from_millis(50)).await.is_none());
        assert_eq!(population.knowledge(1).await.unwrap().payload, Payload::Empty);
    }

    #[actix_rt::test]
    async fn test_corrupted_hop_is_accepted_and_answered() {
        let population = Population::spawn(0, &[true, true], Arc::new(Silent));
        let network = scripted(ScriptedLink::new(Duration::from_millis(1)).corrupt(0, 1));
        let receiver = population.node(1).unwrap().clone();

        let (slot, answer) = reply_slot();
        let hop = network.dispatch(receiver, Message::new(0, Payload::Ok, 1), Some(slot));
        let reply = await_reply(answer, Duration::from_millis(50)).await.unwrap();
        join_hops(vec![hop]).await;
        assert_eq!(reply.payload, Payload::Corrupted);
        assert_eq!(population.knowledge(1).await.unwrap().payload, Payload::Corrupted);
    }

    #[actix_rt::test]
    async fn test_reply_wait_times_out() {
        let population = Population::spawn(0, &[true, true], Arc::new(Silent));
        let network = scripted(ScriptedLink::new(Duration::from_millis(200)));
        let receiver = population.node(1).unwrap().clone();

        let (slot, answer) = reply_slot();
        let _hop = network.dispatch(receiver, Message::new(0, Payload::Ok, 1), Some(slot));
        let started = Instant::now();
        assert!(await_reply(answer, Duration::from_millis(20)).await.is_none());
        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
