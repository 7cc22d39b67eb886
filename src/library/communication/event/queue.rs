/// Lifetime class of a queue
///
/// The class fully determines how the queue is declared, see [`QueueDurability::flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDurability {
    /// Survives broker restarts and is shared between consumers. Suited for aggregated logs.
    Durable,
    /// Removed once its declaring connection goes away and private to that connection.
    /// Suited for per-participant mailboxes.
    Transient,
}

impl QueueDurability {
    /// Declaration flags derived from the class
    pub fn flags(&self) -> QueueFlags {
        match self {
            Self::Durable => QueueFlags {
                durable: true,
                auto_delete: false,
                exclusive: false,
            },
            Self::Transient => QueueFlags {
                durable: false,
                auto_delete: true,
                exclusive: true,
            },
        }
    }
}

/// Flags used when declaring a queue
///
/// Instances can only be obtained from a [`QueueDurability`] so that inconsistent
/// combinations (like a durable, exclusive queue) can never be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueFlags {
    durable: bool,
    auto_delete: bool,
    exclusive: bool,
}

impl QueueFlags {
    /// Whether the queue survives a broker restart
    pub fn durable(&self) -> bool {
        self.durable
    }

    /// Whether the queue is removed once it is no longer in use
    pub fn auto_delete(&self) -> bool {
        self.auto_delete
    }

    /// Whether the queue may only be used by the connection which declared it
    pub fn exclusive(&self) -> bool {
        self.exclusive
    }
}

impl From<QueueDurability> for QueueFlags {
    fn from(durability: QueueDurability) -> Self {
        durability.flags()
    }
}

/// Queue as reported by the broker after declaring it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    name: String,
    flags: QueueFlags,
    message_count: u32,
    consumer_count: u32,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(name: String, flags: QueueFlags, message_count: u32, consumer_count: u32) -> Self {
        Self {
            name,
            flags,
            message_count,
            consumer_count,
        }
    }

    /// Name of the queue, which may have been generated by the broker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flags the queue has been declared with
    pub fn flags(&self) -> QueueFlags {
        self.flags
    }

    /// Number of messages ready for delivery at declaration time
    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    /// Number of active consumers at declaration time
    pub fn consumer_count(&self) -> u32 {
        self.consumer_count
    }
}

/// Describes a queue and the binding through which it receives messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    exchange: String,
    queue: String,
    routing_key: String,
    durability: QueueDurability,
}

impl QueueBinding {
    /// Creates a new instance from raw parts
    ///
    /// The `routing_key` may be a pattern when binding to a topic exchange.
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
        durability: QueueDurability,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
            durability,
        }
    }

    /// Exchange the queue is bound to
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Name of the queue, an empty name lets the broker generate one
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Routing key or pattern of the binding
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Lifetime class of the queue
    pub fn durability(&self) -> QueueDurability {
        self.durability
    }
}
