use std::time::Duration;

/// What the consumer loop does with a delivery once it has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    /// Nack with requeue; the delivery comes back with `attempt + 1` once
    /// the delay has passed.
    Requeue(Duration),
    DeadLetter(String),
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "acked",
            Self::Requeue(_) => "nacked",
            Self::DeadLetter(_) => "dead_lettered",
        }
    }

    pub fn is_requeue(&self) -> bool {
        matches!(self, Self::Requeue(_))
    }
}
