//! User prompt utilities for interactive confirmation

use anyhow::Result;
use dialoguer::{Confirm, Password};

/// Ask user for yes/no confirmation
pub fn confirm(prompt: &str) -> Result<bool> {
    let result = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;

    Ok(result)
}

/// Read a secret without echoing it
pub fn password(prompt: &str) -> Result<String> {
    let result = Password::new().with_prompt(prompt).interact()?;

    Ok(result)
}
