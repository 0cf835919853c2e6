use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::timestamp::{self, Instant};

/// Separates the segments of a project path, e.g. `work/backend`.
pub const SEPARATOR: char = '/';

/// Identifier handed out by the remote server. Servers may use numbers or strings, both are kept
/// as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrameId {
    Number(i64),
    Text(String),
}

impl Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameId::Number(v) => write!(f, "{v}"),
            FrameId::Text(v) => write!(f, "{v}"),
        }
    }
}

/// A frame as stored inside its project node. The project is implied by the position in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    #[serde(with = "timestamp::seconds")]
    pub start: Instant,
    #[serde(with = "timestamp::seconds")]
    pub stop: Instant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FrameId>,
}

/// A frame together with the full path of the project owning it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub project: String,
    pub start: Instant,
    pub stop: Instant,
    pub message: Option<String>,
    pub id: Option<FrameId>,
    /// Index of the frame inside its project node.
    pub(crate) slot: usize,
}

impl Frame {
    pub fn segments(&self) -> Vec<String> {
        self.project.split(SEPARATOR).map(str::to_owned).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub projects: IndexMap<String, ProjectNode>,
}

/// Root of the project hierarchy. It has no name and no frames of its own, its children are the
/// top-level projects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectTree {
    projects: IndexMap<String, ProjectNode>,
}

impl ProjectTree {
    /// Walks to the node at `path`, creating every missing node on the way. Use [Self::find] when
    /// the tree must not change.
    pub fn resolve(&mut self, path: &str) -> &mut ProjectNode {
        let mut segments = path.split(SEPARATOR);
        let first = segments.next().unwrap_or_default();
        let mut node = self.projects.entry(first.to_owned()).or_default();
        for segment in segments {
            node = node.projects.entry(segment.to_owned()).or_default();
        }
        node
    }

    /// Looks a node up without creating anything.
    pub fn find(&self, path: &str) -> Option<&ProjectNode> {
        let mut segments = path.split(SEPARATOR);
        let first = segments.next()?;
        segments.try_fold(self.projects.get(first)?, |node, segment| {
            node.projects.get(segment)
        })
    }

    pub(crate) fn find_mut(&mut self, path: &str) -> Option<&mut ProjectNode> {
        let mut segments = path.split(SEPARATOR);
        let first = segments.next()?;
        segments.try_fold(self.projects.get_mut(first)?, |node, segment| {
            node.projects.get_mut(segment)
        })
    }

    /// Every node of the tree, intermediate ones included, as sorted full paths.
    pub fn list_paths(&self) -> Vec<String> {
        fn collect(projects: &IndexMap<String, ProjectNode>, parent: &str, out: &mut Vec<String>) {
            for (name, node) in projects {
                let path = format!("{parent}{name}");
                collect(&node.projects, &format!("{path}{SEPARATOR}"), out);
                out.push(path);
            }
        }

        let mut paths = vec![];
        collect(&self.projects, "", &mut paths);
        paths.sort();
        paths
    }

    /// Collects every frame with its project path filled in. The result follows the tree
    /// traversal (node frames first, then children in insertion order) and is not sorted by time.
    pub fn flatten_frames(&self) -> Vec<Frame> {
        fn collect(projects: &IndexMap<String, ProjectNode>, parent: &str, out: &mut Vec<Frame>) {
            for (name, node) in projects {
                let path = format!("{parent}{name}");
                out.extend(node.frames.iter().enumerate().map(|(slot, record)| Frame {
                    project: path.clone(),
                    start: record.start,
                    stop: record.stop,
                    message: record.message.clone(),
                    id: record.id.clone(),
                    slot,
                }));
                collect(&node.projects, &format!("{path}{SEPARATOR}"), out);
            }
        }

        let mut frames = vec![];
        collect(&self.projects, "", &mut frames);
        frames
    }
}
