//! Interactive prompts
//!
//! Confirmation, line editing and the terminal file picker. Everything here
//! degrades to "no answer" when stdin is not a terminal.

use anyhow::Result;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use linkbox_core::FilePicker;

/// Asks for paths on the terminal unless one was given up front
pub struct PromptPicker {
    preset: Option<PathBuf>,
}

impl PromptPicker {
    pub fn new(preset: Option<PathBuf>) -> Self {
        Self { preset }
    }

    fn ask(&self, prompt: &str, current: Option<&Path>) -> Option<PathBuf> {
        if !atty::is(atty::Stream::Stdin) {
            return None;
        }
        if let Some(current) = current {
            println!("Current file: {}", current.display());
        }
        match prompt_optional(prompt) {
            Ok(answer) => answer.and_then(|a| parse_path(&a)),
            Err(_) => None,
        }
    }
}

impl FilePicker for PromptPicker {
    fn pick_open(&mut self) -> Option<PathBuf> {
        self.preset
            .take()
            .or_else(|| self.ask("File to open (empty to cancel)", None))
    }

    fn pick_save(&mut self, current: Option<&Path>) -> Option<PathBuf> {
        self.preset
            .take()
            .or_else(|| self.ask("Save as (empty to cancel)", current))
    }
}

/// Turn a typed answer into a path; blank means cancelled
fn parse_path(answer: &str) -> Option<PathBuf> {
    let answer = answer.trim().trim_matches('"');
    if answer.is_empty() {
        None
    } else {
        Some(PathBuf::from(answer))
    }
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Prompt with a default value, returns None if user keeps default
pub fn prompt_with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    io::stdout().flush()?;
    read_answer()
}

/// Prompt for optional value
pub fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    print!("{}: ", prompt);
    io::stdout().flush()?;
    read_answer()
}

fn read_answer() -> Result<Option<String>> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_is_used_once() {
        let mut picker = PromptPicker::new(Some(PathBuf::from("/tmp/links.json")));
        assert_eq!(
            picker.pick_save(None),
            Some(PathBuf::from("/tmp/links.json"))
        );
        assert!(picker.preset.is_none());
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("  links.json \n"), Some(PathBuf::from("links.json")));
        assert_eq!(
            parse_path("\"/home/me/my links.json\""),
            Some(PathBuf::from("/home/me/my links.json"))
        );
        assert_eq!(parse_path("   "), None);
    }
}
