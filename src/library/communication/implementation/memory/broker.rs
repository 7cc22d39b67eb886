use super::super::super::event::{ExchangeDescriptor, ExchangeKind, QueueDescriptor, QueueFlags};
use super::{topic_matches, MemoryBrokerError, MemoryConnection};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

/// Prefix of queue names generated by the broker
pub const GENERATED_QUEUE_PREFIX: &str = "amq.gen-";

/// Message as it is stored in a queue
#[derive(Debug, Clone)]
pub(super) struct Envelope {
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub content_type: String,
}

pub(super) type QueueReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Envelope>>>;

pub(super) struct MemoryQueue {
    flags: QueueFlags,
    owner: u64,
    bindings: Vec<(String, String)>,
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: QueueReceiver,
    pending: usize,
    consumers: usize,
    consumed: bool,
}

impl MemoryQueue {
    fn new(flags: QueueFlags, owner: u64) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        Self {
            flags,
            owner,
            bindings: Vec::new(),
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            pending: 0,
            consumers: 0,
            consumed: false,
        }
    }

    fn describe(&self, name: &str) -> QueueDescriptor {
        QueueDescriptor::new(
            name.to_owned(),
            self.flags,
            self.pending as u32,
            self.consumers as u32,
        )
    }
}

#[derive(Default)]
pub(super) struct BrokerState {
    exchanges: HashMap<String, ExchangeKind>,
    queues: HashMap<String, MemoryQueue>,
    connections: HashSet<u64>,
    channels: HashMap<u64, u64>,
    next_id: u64,
    published: usize,
    acknowledged: usize,
    duplicate_acknowledgements: usize,
}

impl BrokerState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn open_connection(&mut self) -> u64 {
        let id = self.allocate_id();
        self.connections.insert(id);
        id
    }

    /// Removes the connection, its channels and the exclusive queues it owns.
    /// Returns false if the connection has already been closed.
    pub fn close_connection(&mut self, connection: u64) -> bool {
        if !self.connections.remove(&connection) {
            return false;
        }

        self.channels.retain(|_, owner| *owner != connection);
        self.queues
            .retain(|_, queue| !(queue.flags.exclusive() && queue.owner == connection));

        true
    }

    pub fn open_channel(&mut self, connection: u64) -> Result<u64, MemoryBrokerError> {
        if !self.connections.contains(&connection) {
            return Err(MemoryBrokerError::ConnectionClosed);
        }

        let id = self.allocate_id();
        self.channels.insert(id, connection);
        Ok(id)
    }

    pub fn close_channel(&mut self, channel: u64) -> Result<(), MemoryBrokerError> {
        self.channels
            .remove(&channel)
            .map(|_| ())
            .ok_or(MemoryBrokerError::ChannelClosed)
    }

    pub fn ensure_channel(&self, channel: u64) -> Result<(), MemoryBrokerError> {
        if self.channels.contains_key(&channel) {
            Ok(())
        } else {
            Err(MemoryBrokerError::ChannelClosed)
        }
    }

    pub fn declare_exchange(&mut self, exchange: &ExchangeDescriptor) -> Result<(), MemoryBrokerError> {
        match self.exchanges.get(exchange.name()) {
            Some(kind) if *kind != exchange.kind() => Err(MemoryBrokerError::PreconditionFailed(
                exchange.name().to_owned(),
            )),
            Some(_) => Ok(()),
            None => {
                self.exchanges
                    .insert(exchange.name().to_owned(), exchange.kind());
                Ok(())
            }
        }
    }

    pub fn declare_queue(
        &mut self,
        connection: u64,
        name: &str,
        flags: QueueFlags,
    ) -> Result<QueueDescriptor, MemoryBrokerError> {
        let name = if name.is_empty() {
            format!("{}{}", GENERATED_QUEUE_PREFIX, Uuid::new_v4().simple())
        } else {
            name.to_owned()
        };

        if let Some(queue) = self.queues.get(&name) {
            if queue.flags != flags {
                return Err(MemoryBrokerError::PreconditionFailed(name));
            }

            if queue.flags.exclusive() && queue.owner != connection {
                return Err(MemoryBrokerError::ResourceLocked(name));
            }

            return Ok(queue.describe(&name));
        }

        let queue = MemoryQueue::new(flags, connection);
        let descriptor = queue.describe(&name);
        self.queues.insert(name, queue);

        Ok(descriptor)
    }

    pub fn bind_queue(
        &mut self,
        connection: u64,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), MemoryBrokerError> {
        if !self.exchanges.contains_key(exchange) {
            return Err(MemoryBrokerError::ExchangeNotFound(exchange.to_owned()));
        }

        let entry = self.accessible_queue(connection, queue)?;
        let binding = (exchange.to_owned(), routing_key.to_owned());

        if !entry.bindings.contains(&binding) {
            entry.bindings.push(binding);
        }

        Ok(())
    }

    /// Attaches a consumer, returning the receiving end of the queue
    pub fn attach_consumer(
        &mut self,
        connection: u64,
        queue: &str,
    ) -> Result<QueueReceiver, MemoryBrokerError> {
        let entry = self.accessible_queue(connection, queue)?;
        entry.consumers += 1;
        entry.consumed = true;
        Ok(entry.receiver.clone())
    }

    /// Detaches a consumer from the queue it received from.
    /// Auto-delete queues are removed together with their bindings once their last consumer is gone.
    pub fn detach_consumer(&mut self, queue: &str, receiver: &QueueReceiver) {
        let entry = match self.queues.get_mut(queue) {
            // A queue declared again under the same name is not the one being consumed
            Some(entry) if Arc::ptr_eq(&entry.receiver, receiver) => entry,
            _ => return,
        };

        entry.consumers = entry.consumers.saturating_sub(1);

        if entry.consumers == 0 && entry.consumed && entry.flags.auto_delete() {
            self.queues.remove(queue);
            trace!(queue, "Deleted queue after its last consumer left");
        }
    }

    pub fn take_pending(&mut self, queue: &str) {
        if let Some(entry) = self.queues.get_mut(queue) {
            entry.pending = entry.pending.saturating_sub(1);
        }
    }

    /// Routes a message to every matching queue, each queue receiving at most one copy
    pub fn route(&mut self, exchange: &str, envelope: Envelope) -> Result<usize, MemoryBrokerError> {
        // The default exchange routes by queue name
        let kind = if exchange.is_empty() {
            None
        } else {
            Some(
                *self
                    .exchanges
                    .get(exchange)
                    .ok_or_else(|| MemoryBrokerError::ExchangeNotFound(exchange.to_owned()))?,
            )
        };

        let mut routed = 0;

        for (name, queue) in self.queues.iter_mut() {
            let matches = match kind {
                None => *name == envelope.routing_key,
                Some(kind) => queue.bindings.iter().any(|(bound, pattern)| {
                    bound == exchange
                        && match kind {
                            ExchangeKind::Direct => *pattern == envelope.routing_key,
                            ExchangeKind::Topic => topic_matches(pattern, &envelope.routing_key),
                        }
                }),
            };

            if matches && queue.sender.send(envelope.clone()).is_ok() {
                queue.pending += 1;
                routed += 1;
            }
        }

        self.published += 1;
        trace!(exchange, routing_key = %envelope.routing_key, routed, "Routed message");

        Ok(routed)
    }

    pub fn record_acknowledgement(&mut self, duplicate: bool) {
        if duplicate {
            self.duplicate_acknowledgements += 1;
        } else {
            self.acknowledged += 1;
        }
    }

    fn accessible_queue(
        &mut self,
        connection: u64,
        name: &str,
    ) -> Result<&mut MemoryQueue, MemoryBrokerError> {
        let queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| MemoryBrokerError::QueueNotFound(name.to_owned()))?;

        if queue.flags.exclusive() && queue.owner != connection {
            return Err(MemoryBrokerError::ResourceLocked(name.to_owned()));
        }

        Ok(queue)
    }
}

/// Shared handle to an in-memory broker
///
/// Cloning the handle yields another reference to the same broker.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub(super) fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a new connection to the broker
    pub fn connect(&self) -> MemoryConnection {
        let id = self.lock().open_connection();
        MemoryConnection::new(id, self.clone())
    }

    /// Declares an exchange out of band, like an operator would do on a real broker
    ///
    /// Conflicting declarations are ignored.
    pub fn provision_exchange(&self, exchange: &ExchangeDescriptor) {
        if let Err(error) = self.lock().declare_exchange(exchange) {
            trace!(?error, "Ignoring conflicting exchange provisioning");
        }
    }

    /// Kind of the exchange if it has been declared
    pub fn exchange_kind(&self, name: &str) -> Option<ExchangeKind> {
        self.lock().exchanges.get(name).copied()
    }

    /// Flags of the queue if it exists
    pub fn queue_flags(&self, name: &str) -> Option<QueueFlags> {
        self.lock().queues.get(name).map(|queue| queue.flags)
    }

    /// Bindings of the queue as `(exchange, routing key)` pairs
    pub fn bindings(&self, queue: &str) -> Vec<(String, String)> {
        self.lock()
            .queues
            .get(queue)
            .map(|queue| queue.bindings.clone())
            .unwrap_or_default()
    }

    /// Number of messages waiting in the queue
    pub fn pending(&self, queue: &str) -> usize {
        self.lock()
            .queues
            .get(queue)
            .map(|queue| queue.pending)
            .unwrap_or_default()
    }

    /// Number of channels currently open across all connections
    pub fn open_channels(&self) -> usize {
        self.lock().channels.len()
    }

    /// Number of messages accepted by exchanges
    pub fn published(&self) -> usize {
        self.lock().published
    }

    /// Number of deliveries acknowledged
    pub fn acknowledged(&self) -> usize {
        self.lock().acknowledged
    }

    /// Number of acknowledgements for deliveries which had already been acknowledged
    pub fn duplicate_acknowledgements(&self) -> usize {
        self.lock().duplicate_acknowledgements
    }
}
