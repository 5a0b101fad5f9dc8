//! Preview sessions and their owned resources.
//!
//! A session bundles the three live resources of one previewed file:
//!
//! ```text
//! Session(song.lytex)
//! ├── save watcher      (listener + recompile worker)
//! ├── status indicator  (stop control in the status bar)
//! └── display surface   (browser panel showing the PDF)
//! ```
//!
//! Every resource is released through [`Disposable::dispose`], which consumes
//! the handle, so a resource can be released at most once by construction.
//! The surface is the one resource whose teardown can also start outside the
//! registry (the user closes the panel); [`SurfaceState`] records that case.

mod registry;

pub use registry::SessionRegistry;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::SessionKey;
use crate::surface::DisplaySurface;

/// A resource released exactly once.
pub trait Disposable: Send {
    fn dispose(self: Box<Self>);
}

/// Whether the display surface is still ours to dispose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceState {
    /// Surface is live; stopping the session must dispose it.
    #[default]
    Live,
    /// The surface's own close handler already ran.
    ClosedExternally,
}

/// Identity of one session instance.
///
/// A file previewed, stopped and previewed again gets two distinct ids, so
/// work left over from the first session can tell it no longer owns the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One active preview.
pub struct Session {
    pub id: SessionId,
    pub key: SessionKey,
    pub save_watcher: Box<dyn Disposable>,
    pub status_indicator: Box<dyn Disposable>,
    pub surface: Box<dyn DisplaySurface>,
    pub surface_state: SurfaceState,
}

impl Session {
    pub fn new(
        id: SessionId,
        key: SessionKey,
        save_watcher: Box<dyn Disposable>,
        status_indicator: Box<dyn Disposable>,
        surface: Box<dyn DisplaySurface>,
    ) -> Self {
        Self {
            id,
            key,
            save_watcher,
            status_indicator,
            surface,
            surface_state: SurfaceState::Live,
        }
    }

    /// Release every owned resource, skipping a surface that is already gone.
    pub(crate) fn dispose(self) {
        self.save_watcher.dispose();
        self.status_indicator.dispose();
        match self.surface_state {
            SurfaceState::Live => self.surface.dispose(),
            SurfaceState::ClosedExternally => {
                crate::debug!("session"; "surface already closed: {}", self.key);
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("surface_state", &self.surface_state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let first = SessionId::next();
        let second = SessionId::next();
        assert_ne!(first, second);
    }
}
