// Error type returned by the client engine.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Inbound frame, outbound encode, or embedded sync entry failed.
    #[error(transparent)]
    Wire(#[from] radar_wire::Error),
    #[error("transport {operation} failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn transport(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Transport { operation, source }
    }

    /// True when an inbound payload could not be parsed.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::Wire(
                radar_wire::Error::Deserialize(_)
                    | radar_wire::Error::FrameTooLarge { .. }
                    | radar_wire::Error::SyncValueNotArray
                    | radar_wire::Error::SyncEntryNotText { .. }
                    | radar_wire::Error::SyncEntry { .. }
                    | radar_wire::Error::SyncTimestamp { .. }
            )
        )
    }
}
