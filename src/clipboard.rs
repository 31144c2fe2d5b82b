//! Clipboard access for sharing a group's join code.

use arboard::Clipboard;

/// Handler for clipboard operations.
pub struct ClipboardHandler {
    clipboard: Clipboard,
}

impl ClipboardHandler {
    /// Create a new clipboard handler.
    pub fn new() -> Result<Self, arboard::Error> {
        let clipboard = Clipboard::new()?;
        Ok(Self { clipboard })
    }

    /// Put a join code on the system clipboard. Blank codes are ignored.
    pub fn copy_join_code(&mut self, code: &str) -> Result<bool, String> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(false);
        }
        self.clipboard
            .set_text(code.to_string())
            .map_err(|e| format!("Failed to copy join code: {}", e))?;
        Ok(true)
    }
}
