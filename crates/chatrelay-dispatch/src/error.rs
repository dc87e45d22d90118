use chatrelay_channels::ChannelError;

/// Errors produced while handling a single event. None of them are fatal;
/// the dispatcher logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The event lacks an identity the handler needs.
    #[error("event has no {0}")]
    Lookup(&'static str),

    #[error("transport error: {0}")]
    Channel(#[from] ChannelError),
}
