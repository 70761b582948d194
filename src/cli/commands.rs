//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::info;

use crate::config::RenderConfig;
use crate::effects::{create, EffectKind};
use crate::error::Result;
use crate::host::{read_wav, render as render_buffer, write_wav};
use crate::params::ParamRange;
use crate::processor::Processor;

/// Options for `render`, collected from flags
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub overrides: Vec<String>,
    pub state: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub block_size: Option<usize>,
    pub no_latency_compensation: bool,
    pub tail_ms: Option<f32>,
    pub bits: Option<u16>,
    pub save_state: Option<PathBuf>,
}

impl RenderOptions {
    /// Config file (or defaults) with the command-line flags applied on top
    pub fn resolve_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.no_latency_compensation {
            config.latency_compensation = false;
        }
        if let Some(tail_ms) = self.tail_ms {
            config.tail_ms = tail_ms;
        }
        if self.bits.is_some() {
            config.bits_per_sample = self.bits;
        }
        for assignment in &self.overrides {
            config.push_override(assignment)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// List available effects.
pub fn list() -> Result<()> {
    println!("Available effects:");
    println!("{:-<60}", "");
    for kind in EffectKind::all() {
        let processor = kind.instantiate();
        println!(
            "  {:<18} {:<18} {} params",
            kind.id(),
            processor.display_name(),
            processor.parameters().len()
        );
    }
    Ok(())
}

/// Show an effect's parameters.
pub fn params(effect: &str, json: bool) -> Result<()> {
    let processor = create(effect)?;
    let description = processor.get_params();

    if json {
        println!("{}", serde_json::to_string_pretty(&description)?);
        return Ok(());
    }

    println!("{} ({})", processor.display_name(), processor.effect_id());
    println!("{:-<60}", "");
    for param in processor.parameters().iter() {
        let d = param.descriptor();
        match d.range {
            ParamRange::Choice { options } => {
                println!("  {:<16} {:<20} [{}]", d.id, param.display(), options.join(", "));
            }
            range => {
                println!(
                    "  {:<16} {:<20} [{} .. {}] {}",
                    d.id,
                    param.display(),
                    range.min(),
                    range.max(),
                    d.unit
                );
            }
        }
    }
    let meters = processor.meters().names();
    if !meters.is_empty() {
        println!("Meters: {}", meters.join(", "));
    }
    Ok(())
}

/// Render a WAV file through an effect.
pub fn render(effect: &str, input: &Path, output: &Path, options: &RenderOptions) -> Result<()> {
    info!("Rendering {} through {}", input.display(), effect);

    let mut processor = create(effect)?;
    let config = options.resolve_config()?;

    if let Some(path) = &options.state {
        let data = std::fs::read(path)?;
        processor.set_state(&data)?;
        info!("Restored state from {}", path.display());
    }
    config.apply_params(processor.parameters())?;

    let audio = read_wav(input)?;
    let (rendered, report) = render_buffer(
        processor.as_mut(),
        &audio.buffer,
        audio.sample_rate as f64,
        &config,
    )?;

    let bits = config.bits_per_sample.unwrap_or(audio.bits_per_sample.max(16));
    let bits = if bits == 16 || bits == 24 { bits } else { 32 };
    write_wav(output, &rendered, audio.sample_rate, bits)?;

    if let Some(path) = &options.save_state {
        std::fs::write(path, processor.get_state()?)?;
        info!("Saved state to {}", path.display());
    }

    println!(
        "Rendered {} frames ({} blocks) to {}",
        report.frames,
        report.blocks,
        output.display()
    );
    for (name, value) in &report.meters {
        println!("  {}: {:.4}", name, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        std::fs::write(&path, r#"{ "block_size": 128, "tail_ms": 20, "params": { "mix": 50 } }"#)
            .unwrap();

        let options = RenderOptions {
            config: Some(path),
            block_size: Some(64),
            no_latency_compensation: true,
            overrides: vec!["mix=25".to_string()],
            ..RenderOptions::default()
        };
        let config = options.resolve_config().unwrap();
        assert_eq!(config.block_size, 64);
        assert_eq!(config.tail_ms, 20.0);
        assert!(!config.latency_compensation);
        assert_eq!(config.params["mix"], serde_json::json!(25.0));
    }
}
