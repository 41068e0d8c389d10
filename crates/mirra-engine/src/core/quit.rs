use std::cell::Cell;
use std::rc::Rc;

/// Shared flag set when the user asks the application to stop.
///
/// The runtime sets it (window close, Escape); the frame loop polls it after
/// each committed frame. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(Rc<Cell<bool>>);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if !self.0.replace(true) {
            log::info!("quit requested");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = QuitSignal::new();
        let b = a.clone();
        assert!(!b.is_requested());
        a.request();
        a.request();
        assert!(b.is_requested());
    }
}
