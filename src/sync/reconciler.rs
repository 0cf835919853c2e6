use tracing::{debug, info, warn};

use crate::{
    config::RemoteConfig,
    error::Result,
    tracking::{store::Store, tree::Frame},
};

use super::{
    http::HttpRemote,
    remote::{FrameRemote, RemoteFrame},
};

/// Pushes local frames to a [FrameRemote] and records the ids it hands out.
pub struct SyncReconciler<R> {
    remote: R,
}

impl SyncReconciler<HttpRemote> {
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        Ok(Self::new(HttpRemote::new(config)?))
    }
}

impl<R: FrameRemote> SyncReconciler<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    /// Creates every frame without an id remotely, and with `force` also resends the frames that
    /// already have one. Returns the newly created frames with their ids set.
    ///
    /// Updates are sent before creations, so an error never leaves ids issued by the remote
    /// unrecorded: once the creation succeeds nothing else can fail. Ids are matched to frames by
    /// position in the creation response. The store is only changed in memory, it has to be saved
    /// afterwards.
    pub async fn push(&self, store: &mut Store, force: bool) -> Result<Vec<Frame>> {
        let (mut new_frames, existing_frames): (Vec<Frame>, Vec<Frame>) =
            store.frames().into_iter().partition(|frame| frame.id.is_none());
        debug!(
            "Sync found {} new and {} existing frames",
            new_frames.len(),
            existing_frames.len()
        );

        if force && !existing_frames.is_empty() {
            let payload = existing_frames.iter().map(RemoteFrame::for_update).collect();
            self.remote.update(payload).await?;
            info!("Updated {} frames remotely", existing_frames.len());
        }

        if !new_frames.is_empty() {
            let payload = new_frames.iter().map(RemoteFrame::for_creation).collect();
            let ids = self.remote.create(payload).await?;
            if ids.len() != new_frames.len() {
                warn!(
                    "Remote returned {} ids for {} created frames",
                    ids.len(),
                    new_frames.len()
                );
            }

            new_frames.truncate(ids.len());
            for (frame, id) in new_frames.iter_mut().zip(ids) {
                if !store.assign_id(frame, id.clone()) {
                    warn!("Frame of {} disappeared before getting id {id}", frame.project);
                }
                frame.id = Some(id);
            }
            info!("Created {} frames remotely", new_frames.len());
        }

        Ok(new_frames)
    }
}
