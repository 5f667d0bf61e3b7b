use thiserror::Error;

/// The three ways a resolution can end without a channel set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    FetchFailed,
    MalformedManifest,
    ImageLoadFailed,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Malformed manifest: {reason}")]
    MalformedManifest { reason: String },

    #[error("Failed to load images of channel {channel} for device {device}: {reason}")]
    ImageLoadFailed {
        channel: String,
        device: String,
        reason: String,
    },

    #[error("Invalid device name: '{name}'")]
    InvalidDevice { name: String },
}

pub type Result<T> = std::result::Result<T, ChannelError>;

impl ChannelError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedManifest {
            reason: reason.into(),
        }
    }

    /// Resolution outcome this error belongs to. Device validation happens
    /// before anything is fetched, so it is not one of them.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::FetchFailed { .. } => Some(FailureKind::FetchFailed),
            Self::MalformedManifest { .. } => Some(FailureKind::MalformedManifest),
            Self::ImageLoadFailed { .. } => Some(FailureKind::ImageLoadFailed),
            Self::InvalidDevice { .. } => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FetchFailed { .. } => 2,
            Self::MalformedManifest { .. } => 3,
            Self::ImageLoadFailed { .. } => 4,
            Self::InvalidDevice { .. } => 5,
        }
    }
}
