// ============================================================
// Layer 6 — Settings Store
// ============================================================
// Reads and writes DecodeSettings as pretty-printed JSON.
//
// A settings file fixes the decoder architecture (head kind,
// widths, depth, character set) so a later run rebuilds exactly
// the same module. Missing files are an error on load; the
// `init-config` command writes the defaults first.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::application::recognize_use_case::DecodeSettings;
use crate::domain::traits::Persistable;

impl Persistable for DecodeSettings {
    fn save(&self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write settings to '{}'", path.display()))?;

        tracing::debug!("Saved decode settings to '{}'", path.display());
        Ok(())
    }

    fn load(path: &str) -> Result<Self> {
        let json = fs::read_to_string(path).with_context(|| {
            format!("Cannot read settings from '{path}'. Run 'init-config' to create one.")
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Settings file '{path}' is not valid JSON for DecodeSettings"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::prediction::PredictionKind;

    fn scratch(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("scene-text-decoder-{}", std::process::id()));
        dir.join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_save_then_load_restores_settings() {
        let path = scratch("nested/settings.json");
        let settings = DecodeSettings {
            decoder:            PredictionKind::Transformer,
            semantic_attention: true,
            ..DecodeSettings::default()
        };

        settings.save(&path).unwrap();
        assert_eq!(DecodeSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_kind_written_in_kebab_case() {
        let path = scratch("kind.json");
        let settings = DecodeSettings {
            decoder: PredictionKind::TransformerEncoder,
            ..DecodeSettings::default()
        };
        settings.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"transformer-encoder\""));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(DecodeSettings::load(&scratch("does-not-exist.json")).is_err());
    }
}
