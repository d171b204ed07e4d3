//! Shared helpers for the CLI subcommands.

use cadence_song::Song;
use std::path::Path;

/// Load a [`Song`] from a `.json` or `.toml` file, dispatching on extension.
pub fn load_song(path: &Path) -> anyhow::Result<Song> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Song::from_toml(&text)?),
        Some("json") | None => Ok(Song::from_json(&text)?),
        Some(other) => anyhow::bail!("unrecognized song file extension '.{other}' (expected .json or .toml)"),
    }
}
