//! Change events delivered by the notification facility.

use std::ffi::OsString;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An entry appeared.
    Created,

    /// An entry's contents or metadata changed.
    Modified,

    /// An entry disappeared.
    Deleted,

    /// The notification facility dropped events; the specific changes are
    /// unrecoverable from the stream itself.
    Overflow,
}

impl ChangeKind {
    /// Map a raw notify kind onto the monitor's event vocabulary.
    ///
    /// Renames become a deletion of the old name and a creation of the new
    /// one so that a directory moved into the tree starts being watched.
    /// Access notifications carry no state change and are dropped.
    pub fn from_notify(kind: notify::EventKind) -> Option<Self> {
        match kind {
            notify::EventKind::Create(_) => Some(Self::Created),
            notify::EventKind::Remove(_) => Some(Self::Deleted),
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Self::Deleted),
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Created),
            notify::EventKind::Modify(_) => Some(Self::Modified),
            notify::EventKind::Access(_) => None,
            _ => None,
        }
    }
}

/// A single filesystem change: what happened, in which watched directory,
/// and to which entry. Consumed exactly once by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The kind of change.
    pub kind: ChangeKind,

    /// Absolute path of the directory the change happened in.
    pub dir: PathBuf,

    /// Name of the changed entry inside `dir`; absent for overflow.
    pub name: Option<OsString>,

    /// When the event was observed.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(kind: ChangeKind, dir: impl Into<PathBuf>, name: Option<OsString>) -> Self {
        Self {
            kind,
            dir: dir.into(),
            name,
            timestamp: Utc::now(),
        }
    }

    /// An overflow marker standing in for an unknown set of lost events.
    pub fn overflow(dir: impl Into<PathBuf>) -> Self {
        Self::new(ChangeKind::Overflow, dir, None)
    }

    /// Split one raw notify event into per-entry change events.
    ///
    /// A rescan-flagged event means the backend lost events and is surfaced
    /// as a single overflow marker.
    pub fn from_notify(event: &notify::Event) -> Vec<Self> {
        if event.need_rescan() {
            let dir = event.paths.first().cloned().unwrap_or_default();
            return vec![Self::overflow(dir)];
        }

        let Some(kind) = ChangeKind::from_notify(event.kind) else {
            return Vec::new();
        };

        event
            .paths
            .iter()
            .filter_map(|path| {
                let dir = path.parent()?.to_path_buf();
                let name = path.file_name()?.to_os_string();
                Some(Self::new(kind, dir, Some(name)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_create_event_split_per_path() {
        let raw = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path("/project/a.txt".into())
            .add_path("/project/b.txt".into());

        let events = ChangeEvent::from_notify(&raw);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::Created);
        assert_eq!(events[0].dir, Path::new("/project"));
        assert_eq!(events[0].name.as_deref(), Some("a.txt".as_ref()));
    }

    #[test]
    fn test_remove_maps_to_deleted() {
        let raw = notify::Event::new(EventKind::Remove(RemoveKind::Any))
            .add_path("/project/gone".into());

        let events = ChangeEvent::from_notify(&raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Deleted);
    }

    #[test]
    fn test_rename_halves_map_to_delete_and_create() {
        assert_eq!(
            ChangeKind::from_notify(EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(ChangeKind::Deleted)
        );
        assert_eq!(
            ChangeKind::from_notify(EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(ChangeKind::Created)
        );
    }

    #[test]
    fn test_access_is_dropped() {
        let raw = notify::Event::new(EventKind::Access(AccessKind::Any))
            .add_path("/project/a.txt".into());

        assert!(ChangeEvent::from_notify(&raw).is_empty());
    }

    #[test]
    fn test_rescan_flag_becomes_overflow() {
        let raw = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path("/project".into())
            .set_flag(notify::event::Flag::Rescan);

        let events = ChangeEvent::from_notify(&raw);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Overflow);
        assert!(events[0].name.is_none());
    }
}
