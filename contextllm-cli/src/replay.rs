//! Recorded voice transcripts (one JSON `VoiceEvent` per line)

use anyhow::{Context, Result};
use contextllm_core::bus::VoiceEvent;
use std::path::Path;

/// Parse a JSONL recording; blank lines and `#` comments are skipped
pub fn parse_events(content: &str) -> Result<Vec<VoiceEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str::<VoiceEvent>(line)
                .with_context(|| format!("Invalid voice event on line {}", i + 1))
        })
        .collect()
}

pub fn load_events(path: &Path) -> Result<Vec<VoiceEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_events(&content)
}
