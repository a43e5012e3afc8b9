//! `textlens models`: the model selector as a table.

use std::sync::Arc;

use anyhow::{bail, Result};

use textlens_core::{ModelEntry, ServerStatus};
use textlens_understanding::{ModelLister, StatusChecker};

use crate::terminal_output::{bold, note_error, note_warn, render_table, Column};

pub async fn run(checker: Arc<StatusChecker>, preferred_family: &str) -> Result<()> {
    let listing = ModelLister::new(checker, preferred_family).list().await;

    if !listing.status.is_running {
        report_down(&listing.status);
        bail!("inference server unavailable");
    }
    if listing.models.is_empty() {
        note_warn("No vision models installed. Try `ollama pull gemma3:4b`");
        return Ok(());
    }

    print!("{}", render_models(&listing.models));
    Ok(())
}

fn report_down(status: &ServerStatus) {
    note_error(status.error.as_deref().unwrap_or("inference server unavailable"));
}

fn render_models(models: &[ModelEntry]) -> String {
    let columns = [
        Column::new("Model"),
        Column::new("Name"),
        Column::new("Size"),
        Column::new("Description").max_width(60),
    ];
    let rows: Vec<Vec<String>> = models
        .iter()
        .map(|m| {
            let id = if m.recommended {
                bold(&format!("{} *", m.id))
            } else {
                m.id.clone()
            };
            vec![id, m.name.clone(), m.size.clone(), m.description.clone()]
        })
        .collect();
    render_table(&columns, &rows)
}
