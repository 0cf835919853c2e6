use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::Result,
    tracking::{
        timestamp,
        tree::{Frame, FrameId},
    },
};

/// A frame in the shape the remote server expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<FrameId>,
    pub start: String,
    pub stop: String,
    pub project: Vec<String>,
}

impl RemoteFrame {
    /// Creation payload, the id is never sent.
    pub fn for_creation(frame: &Frame) -> Self {
        Self {
            id: None,
            ..Self::for_update(frame)
        }
    }

    pub fn for_update(frame: &Frame) -> Self {
        Self {
            id: frame.id.clone(),
            start: timestamp::to_wire(frame.start),
            stop: timestamp::to_wire(frame.stop),
            project: frame.segments(),
        }
    }
}

/// Server keeping a copy of the frames.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameRemote: Send + Sync {
    /// Creates `frames` remotely. The returned ids are in the same order as `frames`.
    async fn create(&self, frames: Vec<RemoteFrame>) -> Result<Vec<FrameId>>;

    /// Overwrites frames that already exist remotely.
    async fn update(&self, frames: Vec<RemoteFrame>) -> Result<()>;
}
