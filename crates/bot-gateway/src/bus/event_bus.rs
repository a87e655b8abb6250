//! In-process event bus
//!
//! Messages are posted from socket handlers, the heartbeat loop and voice
//! callbacks, and delivered later on a single dispatcher task. Within a topic
//! delivery follows post order even when a later post asks for a shorter delay.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use super::{BusMessage, Topic};

/// Receiver of bus messages for one or more topics
#[async_trait]
pub trait BusSubscriber: Send + Sync {
    async fn on_message(&self, message: BusMessage);
}

#[derive(Debug)]
struct Posted {
    message: BusMessage,
    deadline: Instant,
}

/// Publish/subscribe with delayed delivery
pub struct EventBus {
    subscribers: DashMap<Topic, Vec<Arc<dyn BusSubscriber>>>,
    sender: mpsc::UnboundedSender<Posted>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Posted>>>,
    shutdown: Notify,
    running: AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            subscribers: DashMap::new(),
            sender,
            receiver: Mutex::new(Some(receiver)),
            shutdown: Notify::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Register a handler for a topic
    pub fn subscribe(&self, topic: Topic, subscriber: Arc<dyn BusSubscriber>) {
        self.subscribers.entry(topic).or_default().push(subscriber);
    }

    /// Post a message, delivered no earlier than `delay` from now
    pub fn publish(&self, message: BusMessage, delay: Duration) {
        let posted = Posted {
            message,
            deadline: Instant::now() + delay,
        };
        if self.sender.send(posted).is_err() {
            tracing::warn!(topic = %message.topic(), "Event bus closed, message dropped");
        } else {
            tracing::trace!(topic = %message.topic(), delay_ms = delay.as_millis() as u64, "Message posted");
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the dispatcher task. A bus can only be started once.
    pub fn start(self: Arc<Self>) {
        let Some(receiver) = self.receiver.lock().take() else {
            tracing::warn!("Event bus is already running");
            return;
        };
        self.running.store(true, Ordering::SeqCst);

        let bus = self.clone();
        tokio::spawn(async move {
            bus.run(receiver).await;
        });

        tracing::debug!("Event bus started");
    }

    /// Stop delivering; pending messages are discarded
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }

    async fn run(&self, mut receiver: mpsc::UnboundedReceiver<Posted>) {
        let mut queues: HashMap<Topic, VecDeque<(Instant, BusMessage)>> = HashMap::new();

        while self.is_running() {
            let next_due = queues
                .values()
                .filter_map(|queue| queue.front().map(|(deadline, _)| *deadline))
                .min();

            tokio::select! {
                posted = receiver.recv() => {
                    let Some(posted) = posted else { break };
                    let queue = queues.entry(posted.message.topic()).or_default();
                    // Never schedule ahead of an earlier post on the same topic
                    let deadline = match queue.back() {
                        Some((last, _)) => posted.deadline.max(*last),
                        None => posted.deadline,
                    };
                    queue.push_back((deadline, posted.message));
                }
                () = sleep_until(next_due), if next_due.is_some() => {
                    let now = Instant::now();
                    let mut due = Vec::new();
                    for queue in queues.values_mut() {
                        while queue.front().is_some_and(|(deadline, _)| *deadline <= now) {
                            if let Some((_, message)) = queue.pop_front() {
                                due.push(message);
                            }
                        }
                    }
                    for message in due {
                        self.deliver(message).await;
                    }
                }
                () = self.shutdown.notified() => break,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::debug!("Event bus loop ended");
    }

    async fn deliver(&self, message: BusMessage) {
        let topic = message.topic();
        let subscribers = match self.subscribers.get(&topic) {
            Some(list) => list.clone(),
            None => {
                tracing::debug!(topic = %topic, "No subscriber for message");
                return;
            }
        };
        for subscriber in subscribers {
            subscriber.on_message(message).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    }
}
