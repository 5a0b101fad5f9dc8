//! Session registry - the single source of truth for active previews.
//!
//! Teardown can be requested from three independent places: the stop command,
//! the surface's close handler, and process shutdown. Every operation here is
//! therefore a no-op (or returns a `false`/`None` sentinel) for unknown keys.
//!
//! Resources are always disposed after the lock is released, so dispose
//! handlers never run while the registry is borrowed.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{Session, SessionId, SurfaceState};
use crate::core::SessionKey;
use crate::surface::SurfaceMessage;

/// Owned registry of active sessions, one per source file.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<FxHashMap<SessionKey, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_session(&self, key: &SessionKey) -> bool {
        self.sessions.lock().contains_key(key)
    }

    /// Whether `key` is still held by the session instance `id`.
    ///
    /// `false` once that session stopped, even if a newer one took the key.
    pub fn is_current(&self, key: &SessionKey, id: SessionId) -> bool {
        self.sessions.lock().get(key).is_some_and(|s| s.id == id)
    }

    /// Register a session under its key.
    ///
    /// Callers check [`has_session`](Self::has_session) first. If the key is
    /// taken anyway, the new session wins and the displaced one is disposed.
    pub fn create_session(&self, session: Session) {
        let key = session.key.clone();
        let displaced = self.sessions.lock().insert(key.clone(), session);

        if let Some(old) = displaced {
            crate::debug!("session"; "replaced existing session: {}", key);
            old.dispose();
        }
        crate::debug!("session"; "created: {}", key);
    }

    /// Record that the surface's own close handler already ran.
    pub fn mark_surface_disposed(&self, key: &SessionKey) {
        if let Some(session) = self.sessions.lock().get_mut(key) {
            session.surface_state = SurfaceState::ClosedExternally;
        }
    }

    pub fn is_surface_disposed(&self, key: &SessionKey) -> bool {
        self.sessions
            .lock()
            .get(key)
            .is_some_and(|s| s.surface_state == SurfaceState::ClosedExternally)
    }

    /// Tear down one session. Returns whether a session was removed.
    pub fn stop_session(&self, key: &SessionKey) -> bool {
        let removed = self.sessions.lock().remove(key);
        match removed {
            Some(session) => {
                session.dispose();
                crate::debug!("session"; "stopped: {}", key);
                true
            }
            None => false,
        }
    }

    /// Snapshot of current keys, sorted for stable output.
    pub fn all_session_paths(&self) -> Vec<SessionKey> {
        let mut keys: Vec<_> = self.sessions.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Viewer location of a session's surface, if it has one.
    pub fn surface_location(&self, key: &SessionKey) -> Option<String> {
        self.sessions.lock().get(key).and_then(|s| s.surface.location())
    }

    /// Stop every session, then drop anything left behind.
    ///
    /// Returns the number of sessions torn down.
    pub fn cleanup(&self) -> usize {
        let keys = self.all_session_paths();
        let stopped = keys.iter().filter(|key| self.stop_session(key)).count();

        let leftovers: Vec<_> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        for session in leftovers {
            session.dispose();
        }

        stopped
    }

    /// Best-effort delivery. `false` means no surface is registered for `key`.
    pub fn send_message_to_surface(&self, key: &SessionKey, message: &SurfaceMessage) -> bool {
        self.sessions
            .lock()
            .get(key)
            .is_some_and(|session| post_if_live(session, message))
    }

    /// Like [`send_message_to_surface`](Self::send_message_to_surface), but
    /// only while `key` still belongs to session `id`.
    pub fn send_message_to_session(
        &self,
        key: &SessionKey,
        id: SessionId,
        message: &SurfaceMessage,
    ) -> bool {
        self.sessions
            .lock()
            .get(key)
            .filter(|session| session.id == id)
            .is_some_and(|session| post_if_live(session, message))
    }
}

fn post_if_live(session: &Session, message: &SurfaceMessage) -> bool {
    if session.surface_state != SurfaceState::Live {
        return false;
    }
    session.surface.post(message);
    true
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::session::Disposable;
    use crate::surface::DisplaySurface;

    #[derive(Default)]
    struct Counters {
        watcher: AtomicUsize,
        indicator: AtomicUsize,
        surface: AtomicUsize,
        posted: Mutex<Vec<SurfaceMessage>>,
    }

    enum Slot {
        Watcher,
        Indicator,
    }

    struct Counted(Arc<Counters>, Slot);

    impl Disposable for Counted {
        fn dispose(self: Box<Self>) {
            let counter = match self.1 {
                Slot::Watcher => &self.0.watcher,
                Slot::Indicator => &self.0.indicator,
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeSurface(Arc<Counters>);

    impl Disposable for FakeSurface {
        fn dispose(self: Box<Self>) {
            self.0.surface.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl DisplaySurface for FakeSurface {
        fn post(&self, message: &SurfaceMessage) {
            self.0.posted.lock().push(message.clone());
        }
    }

    fn key(name: &str) -> SessionKey {
        SessionKey::new(Path::new("/tmp/lytex-registry").join(name))
    }

    fn session(key: &SessionKey) -> (Session, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let session = Session::new(
            SessionId::next(),
            key.clone(),
            Box::new(Counted(counters.clone(), Slot::Watcher)),
            Box::new(Counted(counters.clone(), Slot::Indicator)),
            Box::new(FakeSurface(counters.clone())),
        );
        (session, counters)
    }

    fn disposals(c: &Counters) -> (usize, usize, usize) {
        (
            c.watcher.load(Ordering::SeqCst),
            c.indicator.load(Ordering::SeqCst),
            c.surface.load(Ordering::SeqCst),
        )
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        assert!(!registry.has_session(&song));

        let (s, _) = session(&song);
        registry.create_session(s);

        assert!(registry.has_session(&song));
        assert_eq!(registry.session_count(), 1);
        assert_eq!(registry.all_session_paths(), vec![song]);
    }

    #[test]
    fn test_stop_disposes_each_resource_once() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        let (s, counters) = session(&song);
        registry.create_session(s);

        assert!(registry.stop_session(&song));
        assert!(!registry.stop_session(&song));

        assert_eq!(disposals(&counters), (1, 1, 1));
        assert!(!registry.has_session(&song));
    }

    #[test]
    fn test_externally_closed_surface_not_disposed_again() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        let (s, counters) = session(&song);
        registry.create_session(s);

        registry.mark_surface_disposed(&song);
        assert!(registry.is_surface_disposed(&song));
        registry.stop_session(&song);

        assert_eq!(disposals(&counters), (1, 1, 0));
    }

    #[test]
    fn test_disposed_flag_cleared_for_next_session() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");

        let (first, _) = session(&song);
        registry.create_session(first);
        registry.mark_surface_disposed(&song);
        registry.stop_session(&song);

        let (second, counters) = session(&song);
        registry.create_session(second);
        assert!(!registry.is_surface_disposed(&song));
        registry.stop_session(&song);

        assert_eq!(disposals(&counters), (1, 1, 1));
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let registry = SessionRegistry::new();
        let ghost = key("ghost.lytex");

        registry.mark_surface_disposed(&ghost);
        assert!(!registry.stop_session(&ghost));
        assert!(!registry.is_surface_disposed(&ghost));
        assert!(registry.surface_location(&ghost).is_none());
        assert!(!registry.send_message_to_surface(&ghost, &SurfaceMessage::Compile));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_send_message_reaches_surface() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        let (s, counters) = session(&song);
        registry.create_session(s);

        assert!(registry.send_message_to_surface(&song, &SurfaceMessage::Compile));
        assert_eq!(counters.posted.lock().as_slice(), &[SurfaceMessage::Compile]);
    }

    #[test]
    fn test_send_after_external_close_is_dropped() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        let (s, counters) = session(&song);
        registry.create_session(s);

        registry.mark_surface_disposed(&song);
        assert!(!registry.send_message_to_surface(&song, &SurfaceMessage::Compile));
        assert!(counters.posted.lock().is_empty());
    }

    #[test]
    fn test_replaced_session_loses_identity() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");

        let (first, _) = session(&song);
        let first_id = first.id;
        registry.create_session(first);
        assert!(registry.is_current(&song, first_id));
        registry.stop_session(&song);

        let (second, counters) = session(&song);
        let second_id = second.id;
        registry.create_session(second);

        assert!(!registry.is_current(&song, first_id));
        assert!(registry.is_current(&song, second_id));
        assert!(!registry.send_message_to_session(&song, first_id, &SurfaceMessage::Compile));
        assert!(counters.posted.lock().is_empty());

        assert!(registry.send_message_to_session(&song, second_id, &SurfaceMessage::Compile));
        assert_eq!(counters.posted.lock().as_slice(), &[SurfaceMessage::Compile]);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let registry = SessionRegistry::new();
        let mut all = Vec::new();
        for name in ["a.lytex", "b.lytex", "c.lytex"] {
            let (s, counters) = session(&key(name));
            registry.create_session(s);
            all.push(counters);
        }

        assert_eq!(registry.cleanup(), 3);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.cleanup(), 0);

        for counters in all {
            assert_eq!(disposals(&counters), (1, 1, 1));
        }
    }

    #[test]
    fn test_create_over_existing_disposes_displaced() {
        let registry = SessionRegistry::new();
        let song = key("song.lytex");
        let (first, old) = session(&song);
        let (second, new) = session(&song);

        registry.create_session(first);
        registry.create_session(second);

        assert_eq!(registry.session_count(), 1);
        assert_eq!(disposals(&old), (1, 1, 1));
        assert_eq!(disposals(&new), (0, 0, 0));
    }
}
