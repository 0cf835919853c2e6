use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    utils::clock::Clock,
};

use super::{
    session::{ClosedSession, RunningSession, Session},
    timestamp::{self, Instant, RawTimestamp},
    tree::{Frame, FrameId, FrameRecord, ProjectTree},
};

/// Layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    projects: ProjectTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<CurrentDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CurrentDocument {
    #[serde(default)]
    project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<RawTimestamp>,
}

/// Owns the project tree and the running session of one invocation. Every mutation only happens
/// in memory, [Store::save] has to be called to persist it.
///
/// The file is read and rewritten as a whole. Two processes writing to it at the same time will
/// lose data, there is no locking.
pub struct Store {
    path: PathBuf,
    tree: ProjectTree,
    session: Session,
    clock: Box<dyn Clock>,
}

impl Store {
    pub fn new(path: PathBuf, clock: Box<dyn Clock>) -> Self {
        Self {
            path,
            tree: ProjectTree::default(),
            session: Session::Idle,
            clock,
        }
    }

    /// Reads the store at `path`. A missing or zero-length file gives an empty store.
    pub async fn load(path: impl Into<PathBuf>, clock: Box<dyn Clock>) -> Result<Self> {
        let path = path.into();
        debug!("Loading store {path:?}");
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Store {path:?} doesn't exist yet");
                vec![]
            }
            Err(source) => return Err(Error::PersistenceUnavailable { path, source }),
        };
        Self::from_slice(path, &content, clock)
    }

    /// Builds a store from the content of a store file.
    pub fn from_slice(path: PathBuf, content: &[u8], clock: Box<dyn Clock>) -> Result<Self> {
        // An empty file is what gets left behind by creating the store file by hand.
        let document: StoreDocument = if content.is_empty() {
            StoreDocument::default()
        } else {
            serde_json::from_slice(content).map_err(|source| Error::CorruptStore {
                path: path.clone(),
                source,
            })?
        };

        let session = match document.current {
            Some(CurrentDocument {
                project: Some(project),
                start,
            }) if !project.is_empty() => {
                let start = match start {
                    Some(raw) => timestamp::parse(&raw)?,
                    None => timestamp::normalize(clock.time()),
                };
                Session::Running(RunningSession { project, start })
            }
            _ => Session::Idle,
        };

        Ok(Self {
            path,
            tree: document.projects,
            session,
            clock,
        })
    }

    /// Serialized form of the whole store, as written by [Store::save].
    pub fn dump(&self) -> Result<Vec<u8>> {
        let document = StoreDocument {
            projects: self.tree.clone(),
            current: self.session.current().map(|running| CurrentDocument {
                project: Some(running.project.clone()),
                start: Some(running.start.into()),
            }),
        };
        serde_json::to_vec_pretty(&document).map_err(|source| Error::CorruptStore {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the store file with the full current state. The content goes to a sibling
    /// temporary file first and is then renamed over the store, so a failed save leaves the
    /// previous file as it was.
    pub async fn save(&self) -> Result<()> {
        let content = self.dump()?;
        let temp_path = self.temp_path();
        let unavailable = |source| Error::PersistenceUnavailable {
            path: self.path.clone(),
            source,
        };

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(unavailable)?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                warn!("Failed to remove {temp_path:?}: {cleanup}");
            }
            return Err(unavailable(e));
        }
        debug!("Saved store {:?}", self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current(&self) -> Option<&RunningSession> {
        self.session.current()
    }

    pub fn is_started(&self) -> bool {
        self.session.is_started()
    }

    pub fn start(&mut self, project: &str) -> Result<RunningSession> {
        let now = self.now();
        self.session.start(project, now)
    }

    /// Stops the running session and files it as a frame under its project.
    pub fn stop(&mut self, message: Option<String>) -> Result<ClosedSession> {
        let now = self.now();
        let closed = self.session.stop(now)?;
        self.push_frame(&closed.project, closed.start, closed.stop, message);
        Ok(closed)
    }

    pub fn cancel(&mut self) -> Result<RunningSession> {
        self.session.cancel()
    }

    /// Records a frame directly, without going through a session.
    pub fn add_frame(
        &mut self,
        project: &str,
        start: Instant,
        stop: Instant,
        message: Option<String>,
    ) -> Result<()> {
        if project.trim().is_empty() {
            return Err(Error::EmptyProject);
        }
        let (start, stop) = (timestamp::normalize(start), timestamp::normalize(stop));
        if stop < start {
            return Err(Error::InvalidInterval {
                start: timestamp::format(start),
                stop: timestamp::format(stop),
            });
        }
        self.push_frame(project, start, stop, message);
        Ok(())
    }

    /// Every project path, sorted.
    pub fn projects(&self) -> Vec<String> {
        self.tree.list_paths()
    }

    /// Every frame, sorted by start time.
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames = self.tree.flatten_frames();
        frames.sort_by_key(|frame| frame.start);
        frames
    }

    /// Attaches a remote id to the stored frame `frame` was read from. Returns false if the frame
    /// no longer exists.
    pub(crate) fn assign_id(&mut self, frame: &Frame, id: FrameId) -> bool {
        match self
            .tree
            .find_mut(&frame.project)
            .and_then(|node| node.frames.get_mut(frame.slot))
        {
            Some(record) => {
                record.id = Some(id);
                true
            }
            None => false,
        }
    }

    fn push_frame(&mut self, project: &str, start: Instant, stop: Instant, message: Option<String>) {
        let message = message.filter(|v| !v.is_empty());
        self.tree.resolve(project).frames.push(FrameRecord {
            start,
            stop,
            message,
            id: None,
        });
        info!("Added frame to {project} from {start} to {stop}");
    }

    fn now(&self) -> Instant {
        timestamp::normalize(self.clock.time())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        error::Error,
        tracking::{
            session::Session,
            tree::{Frame, FrameId},
        },
        utils::{clock::test_clock::ManualClock, logging::TEST_LOGGING},
    };

    use super::Store;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_530_662_400, 0).unwrap()
    }

    fn store_with_clock() -> (Store, ManualClock) {
        let clock = ManualClock::new(t0() + Duration::milliseconds(300));
        let store = Store::new(PathBuf::from("unused.json"), Box::new(clock.clone()));
        (store, clock)
    }

    fn reload(store: &Store) -> Result<Store> {
        Ok(Store::from_slice(
            store.path().to_owned(),
            &store.dump()?,
            Box::new(ManualClock::new(t0())),
        )?)
    }

    #[test]
    fn test_start_stop_creates_frame() -> Result<()> {
        let (mut store, clock) = store_with_clock();

        let running = store.start("work")?;
        assert_eq!(running.start, t0());

        clock.advance(Duration::minutes(30));
        let closed = store.stop(None)?;

        assert_eq!(store.session(), &Session::Idle);
        assert_eq!(
            store.frames(),
            vec![Frame {
                project: "work".into(),
                start: t0(),
                stop: closed.stop,
                message: None,
                id: None,
                slot: 0,
            }]
        );
        assert_eq!(closed.stop, t0() + Duration::minutes(30));
        Ok(())
    }

    #[test]
    fn test_session_exclusivity() -> Result<()> {
        let (mut store, _) = store_with_clock();
        assert!(matches!(store.stop(None), Err(Error::NotRunning)));
        assert!(matches!(store.cancel(), Err(Error::NotRunning)));

        store.start("work")?;
        assert!(matches!(
            store.start("work"),
            Err(Error::AlreadyRunning { .. })
        ));

        store.cancel()?;
        assert!(!store.is_started());
        assert!(store.frames().is_empty());
        Ok(())
    }

    #[test]
    fn test_stop_message() -> Result<()> {
        let (mut store, _) = store_with_clock();
        store.start("work")?;
        store.stop(Some("".into()))?;
        store.start("work")?;
        store.stop(Some("reviewed".into()))?;

        let messages = store
            .frames()
            .into_iter()
            .map(|v| v.message)
            .collect::<Vec<_>>();
        assert_eq!(messages, vec![None, Some("reviewed".into())]);
        Ok(())
    }

    #[test]
    fn test_frames_sorted_by_start() -> Result<()> {
        let (mut store, _) = store_with_clock();
        store.add_frame("b", t0() + Duration::hours(2), t0() + Duration::hours(3), None)?;
        store.add_frame("a/c", t0(), t0() + Duration::hours(1), None)?;
        store.add_frame("a", t0() + Duration::hours(1), t0() + Duration::hours(2), None)?;

        let projects = store
            .frames()
            .into_iter()
            .map(|v| v.project)
            .collect::<Vec<_>>();

        assert_eq!(projects, vec!["a/c", "a", "b"]);
        assert_eq!(store.projects(), vec!["a", "a/c", "b"]);
        Ok(())
    }

    #[test]
    fn test_equal_starts_keep_traversal_order() -> Result<()> {
        let (mut store, _) = store_with_clock();
        store.add_frame("b", t0(), t0(), None)?;
        store.add_frame("a", t0(), t0(), None)?;
        store.add_frame("b", t0(), t0(), Some("second".into()))?;

        let frames = store.frames();
        let order = frames
            .iter()
            .map(|v| (v.project.as_str(), v.message.as_deref()))
            .collect::<Vec<_>>();

        assert_eq!(order, vec![("b", None), ("b", Some("second")), ("a", None)]);
        Ok(())
    }

    #[test]
    fn test_add_frame_validation() {
        let (mut store, _) = store_with_clock();
        assert!(matches!(
            store.add_frame("work", t0(), t0() - Duration::seconds(1), None),
            Err(Error::InvalidInterval { .. })
        ));
        assert!(matches!(
            store.add_frame(" ", t0(), t0(), None),
            Err(Error::EmptyProject)
        ));
        assert!(store.projects().is_empty());
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let (mut store, _) = store_with_clock();
        store.add_frame("a/b", t0(), t0() + Duration::hours(1), Some("note".into()))?;
        store.add_frame("c", t0(), t0() + Duration::hours(1), None)?;
        let frame = store.frames()[0].clone();
        assert!(store.assign_id(&frame, FrameId::Number(42)));
        store.start("c/d")?;

        let reloaded = reload(&store)?;

        assert_eq!(reloaded.tree(), store.tree());
        assert_eq!(reloaded.frames(), store.frames());
        assert_eq!(reloaded.session(), store.session());
        assert_eq!(reloaded.projects(), vec!["a", "a/b", "c"]);
        Ok(())
    }

    #[test]
    fn test_idle_store_omits_current() -> Result<()> {
        let (store, _) = store_with_clock();
        let value: serde_json::Value = serde_json::from_slice(&store.dump()?)?;
        assert_eq!(value, serde_json::json!({ "projects": {} }));
        Ok(())
    }

    #[test]
    fn test_document_format() -> Result<()> {
        let content = br#"{
            "projects": {
                "work": {
                    "frames": [{"start": 1530662400, "stop": 1530666000, "id": "abc"}],
                    "projects": {
                        "backend": {"frames": [{"start": 1530666000, "stop": 1530669600}]}
                    }
                }
            },
            "current": {"project": "home", "start": 1530669600}
        }"#;

        let store = Store::from_slice("x".into(), content, Box::new(ManualClock::new(t0())))?;

        let frames = store.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].id, Some(FrameId::Text("abc".into())));
        assert_eq!(frames[1].project, "work/backend");
        let current = store.current().unwrap();
        assert_eq!(current.project, "home");
        assert_eq!(current.start, t0() + Duration::hours(2));
        Ok(())
    }

    #[test]
    fn test_current_without_start_defaults_to_now() -> Result<()> {
        let content = br#"{"current": {"project": "home"}}"#;
        let store = Store::from_slice("x".into(), content, Box::new(ManualClock::new(t0())))?;
        assert_eq!(store.current().map(|v| v.start), Some(t0()));

        let content = br#"{"current": {}}"#;
        let store = Store::from_slice("x".into(), content, Box::new(ManualClock::new(t0())))?;
        assert!(!store.is_started());
        Ok(())
    }

    #[test]
    fn test_corrupt_content() {
        let result = Store::from_slice("x".into(), b"{not json", Box::new(ManualClock::new(t0())));
        assert!(matches!(result, Err(Error::CorruptStore { .. })));

        let result = Store::from_slice(
            "x".into(),
            br#"{"current": {"project": "a", "start": "soon"}}"#,
            Box::new(ManualClock::new(t0())),
        );
        assert!(matches!(result, Err(Error::InvalidTimestamp(_))));
    }

    #[tokio::test]
    async fn test_load_missing_and_empty_files() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;

        let missing = Store::load(dir.path().join("absent.json"), Box::new(ManualClock::new(t0()))).await?;
        assert!(missing.projects().is_empty());
        assert!(!missing.is_started());

        let empty_path = dir.path().join("empty.json");
        std::fs::write(&empty_path, b"")?;
        let empty = Store::load(&empty_path, Box::new(ManualClock::new(t0()))).await?;
        assert!(empty.projects().is_empty());
        assert!(empty.frames().is_empty());

        let whitespace_path = dir.path().join("whitespace.json");
        std::fs::write(&whitespace_path, b"  \n")?;
        let result = Store::load(&whitespace_path, Box::new(ManualClock::new(t0()))).await;
        assert!(matches!(result, Err(Error::CorruptStore { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("frames.json");
        let clock = ManualClock::new(t0());

        let mut store = Store::load(&path, Box::new(clock.clone())).await?;
        store.start("work")?;
        clock.advance(Duration::minutes(5));
        store.stop(None)?;
        store.save().await?;

        let loaded = Store::load(&path, Box::new(clock.clone())).await?;
        assert_eq!(loaded.frames(), store.frames());
        assert_eq!(loaded.session(), &Session::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_to_unavailable_destination() -> Result<()> {
        let dir = tempdir()?;
        let store = Store::new(
            dir.path().join("missing").join("frames.json"),
            Box::new(ManualClock::new(t0())),
        );

        let result = store.save().await;

        assert!(matches!(result, Err(Error::PersistenceUnavailable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_replaces_existing_store() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("frames.json");
        std::fs::write(&path, br#"{"projects": {"old": {}}}"#)?;

        let mut store = Store::load(&path, Box::new(ManualClock::new(t0()))).await?;
        store.add_frame("new", t0(), t0() + Duration::minutes(1), None)?;
        store.save().await?;

        let names = std::fs::read_dir(dir.path())?
            .map(|v| Ok(v?.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(names, vec!["frames.json"]);
        let loaded = Store::load(&path, Box::new(ManualClock::new(t0()))).await?;
        assert_eq!(loaded.projects(), vec!["new", "old"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_store() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("frames.json");
        let previous = br#"{"projects": {"old": {}}}"#;
        std::fs::write(&path, previous)?;
        // A directory where the temporary file should go makes the write fail.
        std::fs::create_dir(dir.path().join("frames.json.tmp"))?;

        let mut store = Store::load(&path, Box::new(ManualClock::new(t0()))).await?;
        store.add_frame("new", t0(), t0() + Duration::minutes(1), None)?;
        let result = store.save().await;

        assert!(matches!(result, Err(Error::PersistenceUnavailable { .. })));
        assert_eq!(std::fs::read(&path)?, previous);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temporary_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("frames.json");
        std::fs::create_dir(&path)?;
        std::fs::write(path.join("inside"), b"kept")?;

        let store = Store::new(path.clone(), Box::new(ManualClock::new(t0())));
        let result = store.save().await;

        assert!(matches!(result, Err(Error::PersistenceUnavailable { .. })));
        assert!(!dir.path().join("frames.json.tmp").exists());
        assert_eq!(std::fs::read(path.join("inside"))?, b"kept");
        Ok(())
    }

    #[test]
    fn test_blank_current_project_is_idle() -> Result<()> {
        let content = br#"{"current": {"project": "", "start": 1530662400}}"#;
        let store = Store::from_slice("x".into(), content, Box::new(ManualClock::new(t0())))?;

        assert_eq!(store.session(), &Session::Idle);
        assert!(!store.dump()?.windows(b"current".len()).any(|v| v == b"current"));
        Ok(())
    }
}
