//! Keyboard shortcut registry and documentation.

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, shift: bool, description: &'static str) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl/Cmd");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }
}

/// Registry of the editor's keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Z", true, false, "Undo"),
            Shortcut::new("Z", true, true, "Redo"),
            Shortcut::new("Y", true, false, "Redo"),
            Shortcut::new("Escape", false, false, "Clear selection"),
            Shortcut::new("Delete", false, false, "Delete selected element"),
            Shortcut::new("Backspace", false, false, "Delete selected element"),
            Shortcut::new("Arrows", false, false, "Nudge selection by 1"),
            Shortcut::new("Arrows", false, true, "Nudge selection by 10"),
        ]
    }

    /// Render the shortcut table.
    pub fn render() -> String {
        let mut out = String::from("=== Keyboard Shortcuts ===\n");
        for shortcut in Self::all() {
            out.push_str(&format!("  {:20} {}\n", shortcut.format(), shortcut.description));
        }
        out
    }

    pub fn print_all() {
        println!("\n{}", Self::render());
    }
}
