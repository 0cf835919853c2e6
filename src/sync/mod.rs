//! Uploads local frames to a remote server.
//!  - [reconciler::SyncReconciler] decides which frames get created or updated.
//!  - [remote::FrameRemote] is the contract a server has to honor, ids come back in request order.
//!  - [http::HttpRemote] is the JSON over HTTP realization of it.

pub mod http;
pub mod reconciler;
pub mod remote;
