//! Subgenre presets: a display name, a description and the tempo.
//!
//! Presets are read from `<dir>/<subgenre>_techno.json`, where `dir` comes
//! from `TECHNO_PRESET_DIR` (default `presets`). A subgenre without a file
//! uses its built-in preset.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::mix::Subgenre;

pub const PRESET_DIR_VAR: &str = "TECHNO_PRESET_DIR";
pub const DEFAULT_PRESET_DIR: &str = "presets";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub bpm: u32,
}

static BUILTIN: Lazy<Vec<(Subgenre, Preset)>> = Lazy::new(|| {
    let preset = |subgenre: Subgenre, name: &str, description: &str| Preset {
        name: name.into(),
        description: description.into(),
        bpm: subgenre.default_bpm() as u32,
    };
    vec![
        (Subgenre::Minimal, preset(Subgenre::Minimal, "Minimal Techno", "Clean tight kick, sparse hats, subtle bass and slow filter movement")),
        (Subgenre::Industrial, preset(Subgenre::Industrial, "Industrial Techno", "Distorted kick, grinding bass, saturated and crushed master")),
        (Subgenre::Dub, preset(Subgenre::Dub, "Dub Techno", "Muffled kick, long looping main section, heavy tape delay")),
    ]
});

impl Preset {
    pub fn validate(&self) -> Result<()> {
        if self.bpm == 0 {
            return Err(Error::invalid("bpm", self.bpm, "a tempo > 0"));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let preset: Preset = serde_json::from_str(json)?;
        preset.validate()?;
        Ok(preset)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn builtin(subgenre: Subgenre) -> &'static Preset {
        BUILTIN
            .iter()
            .find(|(g, _)| *g == subgenre)
            .map(|(_, p)| p)
            .unwrap_or(&BUILTIN[0].1)
    }

    pub fn with_bpm(self, bpm: Option<u32>) -> Self {
        match bpm {
            Some(bpm) => Preset { bpm, ..self },
            None => self,
        }
    }
}

pub fn preset_dir() -> PathBuf {
    std::env::var_os(PRESET_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PRESET_DIR))
}

pub fn preset_path(dir: &Path, subgenre: Subgenre) -> PathBuf {
    dir.join(format!("{}_techno.json", subgenre))
}

/// The preset file for `subgenre` in `dir`, or the built-in one when there is none.
/// A file that exists but does not parse is an error.
pub fn load_from(dir: &Path, subgenre: Subgenre) -> Result<Preset> {
    let path = preset_path(dir, subgenre);
    if path.is_file() {
        debug!(path = %path.display(), "loading preset");
        Preset::from_file(&path)
    } else {
        debug!(%subgenre, "using built-in preset");
        Ok(Preset::builtin(subgenre).clone())
    }
}

pub fn load(subgenre: Subgenre) -> Result<Preset> {
    load_from(&preset_dir(), subgenre)
}

/// Every subgenre's preset, in subgenre order.
pub fn list_from(dir: &Path) -> Result<Vec<(Subgenre, Preset)>> {
    Subgenre::ALL.into_iter().map(|g| Ok((g, load_from(dir, g)?))).collect()
}
