//! Stems from an external text-to-music program.
//!
//! The program is invoked as
//! `<program> <prompt> --secs N --model M --output P --no-playback --no-interactive`
//! and must leave a WAV file at `P`.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::{Stems, SynthGenerator};
use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::phrase::Element;
use crate::presets::KickStyle;
use crate::reader::read_wav;

pub const MODEL_BIN_VAR: &str = "TECHNO_MODEL_BIN";
pub const DEFAULT_PROGRAM: &str = "musicgpt";
pub const DEFAULT_MODEL: &str = "small";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 10;

#[derive(Clone, Debug)]
pub struct ModelGenerator {
    pub program: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ModelGenerator {
    fn default() -> Self {
        ModelGenerator {
            program: DEFAULT_PROGRAM.into(),
            model: DEFAULT_MODEL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ModelGenerator {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        ModelGenerator {
            program: program.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// The program named by `TECHNO_MODEL_BIN`, else `musicgpt`.
    pub fn from_env() -> Self {
        match std::env::var(MODEL_BIN_VAR) {
            Ok(program) if !program.is_empty() => ModelGenerator { program, ..Self::default() },
            _ => Self::default(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        ModelGenerator { timeout, ..self }
    }

    fn failed(&self, detail: impl Into<String>) -> Error {
        Error::ExternalToolFailed {
            tool: self.program.clone(),
            detail: detail.into(),
        }
    }

    fn spawn(&self, prompt: &str, secs: u32, output: &Path) -> Result<Child> {
        Command::new(&self.program)
            .arg(prompt)
            .args(["--secs", &secs.to_string(), "--model", &self.model, "--output"])
            .arg(output)
            .args(["--no-playback", "--no-interactive"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => Error::ExternalToolUnavailable(self.program.clone()),
                _ => Error::Io(e),
            })
    }

    /// Run the program for one stem and load what it wrote to `output`.
    /// Any file already at `output` is removed first. The child is killed
    /// once `timeout` has passed.
    pub fn stem(&self, prompt: &str, secs: u32, output: &Path) -> Result<Buffer> {
        match std::fs::remove_file(output) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut child = self.spawn(prompt, secs, output)?;
        // drained while the child runs; a full pipe would stall it
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut bytes = Vec::new();
                let _ = pipe.read_to_end(&mut bytes);
                String::from_utf8_lossy(&bytes).into_owned()
            })
        });
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                child.kill()?;
                child.wait()?;
                return Err(Error::ExternalToolTimeout {
                    tool: self.program.clone(),
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            let stderr = stderr.and_then(|reader| reader.join().ok()).unwrap_or_default();
            return Err(self.failed(format!("{}: {}", status, tail(&stderr, STDERR_TAIL_LINES))));
        }
        if !output.exists() {
            return Err(self.failed(format!("no file at {}", output.display())));
        }
        read_wav(output)
    }

    /// One stem per prompt, written to `<output_dir>/<element>.wav`.
    /// Failed stems are logged and left out.
    pub fn all_stems(&self, prompts: &[(Element, String)], secs: u32, output_dir: &Path) -> Result<Stems> {
        std::fs::create_dir_all(output_dir)?;
        let mut stems = Stems::new();
        for (element, prompt) in prompts {
            info!(element = element.name(), "generating stem");
            match self.stem(prompt, secs, &stem_path(output_dir, *element)) {
                Ok(stem) => {
                    stems.insert(*element, stem);
                }
                Err(e) => warn!(element = element.name(), error = %e, "skipping stem"),
            }
        }
        Ok(stems)
    }

    /// The model's stem, or a synthesized one of `bars` bars when the program
    /// is missing, hangs or fails. Other errors propagate.
    pub fn stem_or_synth(&self, element: Element, prompt: &str, bars: u32, synth: &SynthGenerator, output_dir: &Path) -> Result<Buffer> {
        let secs = (synth.context().timing().bars_to_ms(bars as f64) / 1000.0).ceil() as u32;
        std::fs::create_dir_all(output_dir)?;
        match self.stem(prompt, secs, &stem_path(output_dir, element)) {
            Ok(stem) => Ok(stem),
            Err(e) if e.is_recoverable() => {
                warn!(element = element.name(), error = %e, "falling back to synthesis");
                synth.stem(element, bars, KickStyle::Minimal)
            }
            Err(e) => Err(e),
        }
    }
}

/// The last `n` non-empty lines of `text`.
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

fn stem_path(dir: &Path, element: Element) -> PathBuf {
    dir.join(format!("{}.wav", element.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::Primitive;

    const MISSING: &str = "techno-no-such-model-binary";

    #[test]
    fn test_missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let g = ModelGenerator::new(MISSING, "small");
        let err = g.stem("dark kick", 4, &dir.path().join("kick.wav")).unwrap_err();
        assert!(matches!(err, Error::ExternalToolUnavailable(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_all_stems_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let g = ModelGenerator::new(MISSING, "small");
        let prompts = vec![(Element::Kick, "kick".to_string()), (Element::Hats, "hats".to_string())];
        let stems = g.all_stems(&prompts, 4, &dir.path().join("stems")).unwrap();
        assert!(stems.is_empty());
        assert!(dir.path().join("stems").is_dir());
    }

    #[test]
    fn test_falls_back_to_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let synth = SynthGenerator::new(Primitive::new(128.0).unwrap().with_seed(Some(1)));
        let stem = ModelGenerator::new(MISSING, "small")
            .stem_or_synth(Element::Kick, "kick", 2, &synth, dir.path())
            .unwrap();
        let ctx = synth.context();
        assert_eq!(stem.len(), ctx.timing().bars_to_samples(2.0, ctx.sample_rate()));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::render::engrave::write_wav;

        fn script(dir: &Path, body: &str) -> String {
            let path = dir.join("model.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            path.display().to_string()
        }

        struct ScriptedModel {
            inner: ModelGenerator,
            script: String,
        }

        impl ScriptedModel {
            fn stem(&self, output: &Path) -> Result<Buffer> {
                self.inner.stem(&self.script, 1, output)
            }
        }

        // `sh <script> --secs N --model M --output P ...` leaves the output
        // path in $6.
        fn sh(dir: &Path, body: &str) -> ScriptedModel {
            ScriptedModel {
                inner: ModelGenerator::new("sh", "small"),
                script: script(dir, body),
            }
        }

        #[test]
        fn test_reads_generated_file() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("source.wav");
            write_wav(&source, &Buffer::mono(vec![0.25; 441], 44100).unwrap()).unwrap();
            let model = sh(dir.path(), &format!("cp '{}' \"$6\"", source.display()));
            let stem = model.stem(&dir.path().join("out.wav")).unwrap();
            assert_eq!(stem.len(), 441);
            assert!((stem.peak() - 0.25).abs() < 1e-3);
        }

        #[test]
        fn test_nonzero_exit_and_missing_output_fail() {
            let dir = tempfile::tempdir().unwrap();
            let err = sh(dir.path(), "echo boom >&2; exit 3").stem(&dir.path().join("a.wav")).unwrap_err();
            assert!(matches!(&err, Error::ExternalToolFailed { detail, .. } if detail.contains("boom")));

            let err = sh(dir.path(), "exit 0").stem(&dir.path().join("b.wav")).unwrap_err();
            assert!(matches!(err, Error::ExternalToolFailed { .. }));
        }

        #[test]
        fn test_chatty_program_is_not_blocked() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("source.wav");
            write_wav(&source, &Buffer::mono(vec![0.25; 441], 44100).unwrap()).unwrap();
            let body = format!("yes progress | head -c 300000 >&2\ncp '{}' \"$6\"", source.display());
            let mut model = sh(dir.path(), &body);
            model.inner.timeout = Duration::from_secs(20);
            let started = Instant::now();
            let stem = model.stem(&dir.path().join("out.wav")).unwrap();
            assert_eq!(stem.len(), 441);
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test]
        fn test_stale_output_is_not_reused() {
            let dir = tempfile::tempdir().unwrap();
            let output = dir.path().join("kick.wav");
            write_wav(&output, &Buffer::mono(vec![0.5; 441], 44100).unwrap()).unwrap();
            let err = sh(dir.path(), "exit 0").stem(&output).unwrap_err();
            assert!(matches!(err, Error::ExternalToolFailed { .. }));
            assert!(!output.exists());
        }

        #[test]
        fn test_failure_reports_last_stderr_lines() {
            let dir = tempfile::tempdir().unwrap();
            let body = "i=0; while [ $i -lt 50 ]; do echo \"line $i\" >&2; i=$((i+1)); done; exit 1";
            let err = sh(dir.path(), body).stem(&dir.path().join("d.wav")).unwrap_err();
            match err {
                Error::ExternalToolFailed { detail, .. } => {
                    assert!(detail.contains("line 49"));
                    assert!(!detail.contains("line 39"));
                }
                other => panic!("unexpected {}", other),
            }
        }

        #[test]
        fn test_hung_program_is_killed() {
            let dir = tempfile::tempdir().unwrap();
            let mut model = sh(dir.path(), "sleep 10");
            model.inner.timeout = Duration::from_millis(200);
            let started = Instant::now();
            let err = model.stem(&dir.path().join("c.wav")).unwrap_err();
            assert!(matches!(err, Error::ExternalToolTimeout { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
