//! `textlens status`: is the inference server up, and which vision models
//! does it have.

use anyhow::{bail, Result};

use textlens_understanding::StatusChecker;

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

pub async fn run(checker: &StatusChecker, server_address: &str) -> Result<()> {
    let status = checker.check().await;

    if !status.is_running {
        note_error(&format!("Inference server at {server_address} is not reachable"));
        if let Some(error) = &status.error {
            note_error(error);
        }
        bail!("inference server unavailable");
    }

    note_success(&format!("Inference server at {server_address} is running"));
    if status.models.is_empty() {
        note_warn("No vision models installed. Try `ollama pull gemma3:4b`");
        return Ok(());
    }

    note_info(&format!("{} vision model(s) installed:", status.models.len()));
    for model in &status.models {
        println!("  - {model}");
    }
    Ok(())
}
