//! View state management for the terminal player
//!
//! Tracks what is on screen and computes what changed between frames so only
//! the difference gets printed.

use crate::types::EngineState;

/// Clear the terminal screen (cross-platform)
pub fn clear_screen() {
    // Try ANSI escape codes first (works on most terminals)
    print!("\x1b[2J\x1b[H");

    // Fallback: print newlines
    if std::io::Write::flush(&mut std::io::stdout()).is_err() {
        for _ in 0..50 {
            println!();
        }
    }
}

/// Layers currently on screen
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub background: Option<String>,
    pub foreground: Vec<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `engine`'s layers and return what changed
    pub fn apply(&mut self, engine: &EngineState) -> RenderDelta {
        let mut delta = RenderDelta::default();

        if engine.background != self.background {
            match &engine.background {
                Some(background) => delta.changes.push(format!("Background: {}", background)),
                None => delta.changes.push("Background cleared".to_string()),
            }
            self.background = engine.background.clone();
        }

        for layer in &self.foreground {
            if !engine.foreground.contains(layer) {
                delta.changes.push(format!("Hide: {}", layer));
            }
        }
        for layer in &engine.foreground {
            if !self.foreground.contains(layer) {
                delta.changes.push(format!("Show: {}", layer));
            }
        }
        self.foreground = engine.foreground.clone();

        delta
    }
}

/// Human-readable changes between two frames
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderDelta {
    pub changes: Vec<String>,
}

impl RenderDelta {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Print a render delta
pub fn render_delta(delta: &RenderDelta) {
    for change in &delta.changes {
        println!("[{}]", change);
    }
    if !delta.is_empty() {
        println!();
    }
}
