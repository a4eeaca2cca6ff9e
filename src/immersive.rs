//! Immersive (AR / VR) sessions.
//!
//! The platform owns the session; a view only needs to know whether one is
//! presenting and how to end it. [`SimulatedSession`] stands in on platforms
//! without an XR runtime.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImmersiveMode {
    Ar,
    Vr,
}

impl ImmersiveMode {
    /// Element id of the entry affordance the view inserts into the document.
    pub fn affordance_id(&self) -> &'static str {
        match self {
            ImmersiveMode::Ar => "ARButton",
            ImmersiveMode::Vr => "VRButton",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImmersiveMode::Ar => "START AR",
            ImmersiveMode::Vr => "ENTER VR",
        }
    }
}

pub trait ImmersiveSession {
    fn mode(&self) -> ImmersiveMode;

    fn is_presenting(&self) -> bool;

    /// Ends the session. Ending a session that is not presenting does nothing.
    fn end(&mut self);
}

/// A session without an XR runtime behind it.
///
/// Clones share state, so a test can keep one clone and observe what the
/// controller did with the other.
#[derive(Clone, Debug)]
pub struct SimulatedSession {
    mode: ImmersiveMode,
    presenting: Arc<AtomicBool>,
    ends: Arc<AtomicUsize>,
}

impl SimulatedSession {
    pub fn start(mode: ImmersiveMode) -> Self {
        log::info!("immersive {:?} session started", mode);
        Self {
            mode,
            presenting: Arc::new(AtomicBool::new(true)),
            ends: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How often `end` actually ended the session.
    pub fn end_count(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}

impl ImmersiveSession for SimulatedSession {
    fn mode(&self) -> ImmersiveMode {
        self.mode
    }

    fn is_presenting(&self) -> bool {
        self.presenting.load(Ordering::SeqCst)
    }

    fn end(&mut self) {
        if self.presenting.swap(false, Ordering::SeqCst) {
            self.ends.fetch_add(1, Ordering::SeqCst);
            log::info!("immersive {:?} session ended", self.mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ending_twice_ends_once() {
        let observer = SimulatedSession::start(ImmersiveMode::Vr);
        let mut session = observer.clone();
        assert!(observer.is_presenting());
        session.end();
        session.end();
        assert!(!observer.is_presenting());
        assert_eq!(observer.end_count(), 1);
    }

    #[test]
    fn affordance_ids_match_the_mode() {
        assert_eq!(ImmersiveMode::Ar.affordance_id(), "ARButton");
        assert_eq!(ImmersiveMode::Vr.affordance_id(), "VRButton");
    }
}
