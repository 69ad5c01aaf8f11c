use crate::{resolver, subscription, topic};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Topic filter error: {0}")]
    Topic(#[from] topic::Error),
    #[error("Subscription error: {0}")]
    Subscription(#[from] subscription::Error),
    #[error("Resolve error: {0}")]
    Resolve(#[from] resolver::Error),
}
