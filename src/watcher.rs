//! Notices when applications get installed or removed by watching the
//! application directories with inotify.
//!
//! Subdirectories are watched too, since desktop entries may live in them.
//! A directory that does not exist yet is stood in for by its closest
//! existing ancestor until it gets created.

use std::{
    collections::HashMap,
    fs,
    io::{self, ErrorKind},
    os::fd::{AsFd, OwnedFd},
    path::{Path, PathBuf},
};

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask};
use log::{debug, warn};

use crate::error::WatchError;

pub struct AppDirWatcher {
    inotify: Inotify,
    roots: Vec<PathBuf>,
    watched: HashMap<WatchDescriptor, PathBuf>,
    buffer: [u8; 4096],
}
impl AppDirWatcher {
    /// At least one directory has to be watchable, either one of `dirs` or an
    /// ancestor of one.
    pub fn new(dirs: &[PathBuf]) -> Result<Self, WatchError> {
        let inotify = Inotify::init().map_err(WatchError::Init)?;
        let mut watcher = Self {
            inotify,
            roots: dirs.to_vec(),
            watched: HashMap::new(),
            buffer: [0; 4096],
        };
        watcher.rearm();
        if watcher.watched.is_empty() {
            return Err(WatchError::NothingWatched);
        }
        debug!("Watching {} directories for application changes", watcher.watched.len());
        Ok(watcher)
    }

    /// A second handle on the inotify descriptor for the event loop to poll.
    pub fn poll_fd(&self) -> io::Result<OwnedFd> {
        self.inotify.as_fd().try_clone_to_owned()
    }

    /// Reads everything queued without blocking. Returns whether any of it
    /// touched a desktop entry or an application directory.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        let mut rearm = false;
        let mut lost = Vec::new();
        let mut moved = Vec::new();
        loop {
            match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => {
                    let mut empty = true;
                    for event in events {
                        empty = false;
                        if event.mask.contains(EventMask::IGNORED) {
                            lost.push(event.wd);
                            continue;
                        }
                        if event.mask.intersects(EventMask::DELETE_SELF | EventMask::MOVE_SELF) {
                            if event.mask.contains(EventMask::MOVE_SELF) {
                                moved.push(event.wd.clone());
                            }
                            lost.push(event.wd);
                            changed = true;
                            rearm = true;
                            continue;
                        }
                        let (Some(name), Some(parent)) = (event.name, self.watched.get(&event.wd)) else {
                            continue;
                        };
                        let path = parent.join(name);
                        if event.mask.contains(EventMask::ISDIR) {
                            // a subdirectory, or a missing application directory showing up
                            if self.roots.iter().any(|root| path.starts_with(root) || root.starts_with(&path)) {
                                changed = true;
                                rearm = true;
                            }
                        } else if path.extension().is_some_and(|ext| ext == "desktop")
                            && self.roots.iter().any(|root| path.starts_with(root))
                        {
                            changed = true;
                        }
                    }
                    if empty {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!("Failed to read application directory events: {err}");
                    break;
                }
            }
        }

        for wd in moved {
            // the watch follows the moved directory, which is no longer ours
            if let Err(err) = self.inotify.watches().remove(wd) {
                debug!("Failed to remove watch on a moved directory: {err}");
            }
        }
        for wd in lost {
            if let Some(dir) = self.watched.remove(&wd) {
                debug!("Stopped watching {}", dir.display());
            }
        }
        if rearm {
            self.rearm();
        }
        changed
    }

    fn rearm(&mut self) {
        let mut targets = Vec::new();
        for root in &self.roots {
            if root.is_dir() {
                collect_dirs(root, &mut targets);
            } else if let Some(ancestor) = root.ancestors().skip(1).find(|dir| dir.is_dir()) {
                targets.push(ancestor.to_path_buf());
            }
        }

        for dir in targets {
            if self.watched.values().any(|watched| *watched == dir) {
                continue;
            }
            match self.inotify.watches().add(&dir, watch_mask()) {
                Ok(wd) => {
                    debug!("Watching {}", dir.display());
                    self.watched.insert(wd, dir);
                }
                Err(source) => warn!("{}", WatchError::Watch { path: dir, source }),
            }
        }
    }
}

fn watch_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::DELETE
        | WatchMask::MODIFY
        | WatchMask::CLOSE_WRITE
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
        | WatchMask::DELETE_SELF
        | WatchMask::MOVE_SELF
}

/// `dir` and every directory below it. Symlinks are not followed.
fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) {
    out.push(dir.to_path_buf());
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_type().is_ok_and(|kind| kind.is_dir()) {
            collect_dirs(&entry.path(), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(dir: &Path) -> AppDirWatcher {
        AppDirWatcher::new(&[dir.to_path_buf()]).unwrap()
    }

    #[test]
    fn nothing_to_watch_is_an_error() {
        assert!(matches!(AppDirWatcher::new(&[]), Err(WatchError::NothingWatched)));
    }

    #[test]
    fn new_desktop_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = watch(dir.path());
        assert!(!watcher.drain());

        fs::write(dir.path().join("new.desktop"), "[Desktop Entry]\n").unwrap();
        assert!(watcher.drain());
        assert!(!watcher.drain());
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = watch(dir.path());

        fs::write(dir.path().join("mimeinfo.cache"), "").unwrap();
        assert!(!watcher.drain());
    }

    #[test]
    fn existing_subdirectories_are_watched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("kde4")).unwrap();
        let mut watcher = watch(dir.path());

        fs::write(dir.path().join("kde4").join("konsole.desktop"), "").unwrap();
        assert!(watcher.drain());
    }

    #[test]
    fn new_subdirectories_get_watched() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = watch(dir.path());

        let sub = dir.path().join("vendor");
        fs::create_dir(&sub).unwrap();
        assert!(watcher.drain());

        fs::write(sub.join("tool.desktop"), "").unwrap();
        assert!(watcher.drain());
    }

    #[test]
    fn directories_created_later_are_picked_up() {
        let share = tempfile::tempdir().unwrap();
        let apps = share.path().join("applications");
        let mut watcher = watch(&apps);

        fs::create_dir(share.path().join("icons")).unwrap();
        fs::write(share.path().join("stray.desktop"), "").unwrap();
        assert!(!watcher.drain());

        fs::create_dir(&apps).unwrap();
        assert!(watcher.drain());

        fs::write(apps.join("app.desktop"), "").unwrap();
        assert!(watcher.drain());
    }

    #[test]
    fn recreated_directories_are_watched_again() {
        let share = tempfile::tempdir().unwrap();
        let apps = share.path().join("applications");
        fs::create_dir(&apps).unwrap();
        let mut watcher = watch(&apps);

        fs::remove_dir(&apps).unwrap();
        assert!(watcher.drain());

        fs::create_dir(&apps).unwrap();
        assert!(watcher.drain());

        fs::write(apps.join("app.desktop"), "").unwrap();
        assert!(watcher.drain());
    }
}
