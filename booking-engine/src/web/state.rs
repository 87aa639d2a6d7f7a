//! Application state for the web layer.

use std::sync::Arc;

use crate::engine::Engine;
use crate::page::PageFactory;

/// Shared application state.
pub struct AppState<F: PageFactory> {
    /// The engine owning every run
    pub engine: Arc<Engine<F>>,
}

impl<F: PageFactory> AppState<F> {
    pub fn new(engine: Arc<Engine<F>>) -> Self {
        Self { engine }
    }
}

// Derived Clone would require `F: Clone`.
impl<F: PageFactory> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}
