use std::fmt;

/// Routing rule applied by an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    /// Forwards to queues whose binding key equals the routing key
    Direct,
    /// Forwards to queues whose binding pattern matches the dot-separated routing key
    Topic,
}

impl ExchangeKind {
    /// Name of the exchange type as understood by AMQP brokers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Topic => "topic",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named routing entity on the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDescriptor {
    name: String,
    kind: ExchangeKind,
}

impl ExchangeDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Name under which the exchange is known to the broker
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing rule of the exchange
    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }
}
