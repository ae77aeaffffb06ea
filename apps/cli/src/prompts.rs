use arboard::Clipboard;
use client_core::{ClipboardSink, ConfirmPrompt};
use dialoguer::Confirm;

/// Asks on the terminal. Any prompt error counts as "no".
pub struct TerminalConfirm;

impl ConfirmPrompt for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Used by `--yes`.
pub struct AssumeYes;

impl ConfirmPrompt for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), String> {
        let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|err| err.to_string())
    }
}
