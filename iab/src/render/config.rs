//! Renderer configuration (§6): the loudspeaker geometry and mixing topology the
//! core consumes, parsed from an external YAML collaborator the way `truehdd` reads
//! its own decoder-options file.

use std::path::Path;

use serde::Deserialize;

use crate::structs::element::UseCase;

/// Target soundfield layout hint. Drives two things: the speaker geometry is
/// always `physical_speakers`/`vbap_triangulation` regardless of this field,
/// but [`TargetSoundfield::to_use_case`] also selects which conditionally-tagged
/// bed/object variant the renderer activates (§4.2 "Conditional activation
/// rules": "Conditional with use-case matching the renderer's target ⇒ active").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSoundfield {
    Stereo,
    Surround5_1,
    Surround7_1,
    Immersive9_1Oh,
    Custom,
}

impl TargetSoundfield {
    /// Maps this target to the `UseCase` passed to `active_variant()` when
    /// walking a frame's conditional bed/object tree. `Stereo`/`Custom` have no
    /// dedicated bed use-case of their own (a stereo or arbitrary custom layout
    /// is built by downmixing whichever variant activates for `Always`), so
    /// both map to `UseCase::Always`.
    pub fn to_use_case(self) -> UseCase {
        match self {
            TargetSoundfield::Stereo | TargetSoundfield::Custom => UseCase::Always,
            TargetSoundfield::Surround5_1 => UseCase::Bed5_1,
            TargetSoundfield::Surround7_1 => UseCase::Bed7_1Ds,
            TargetSoundfield::Immersive9_1Oh => UseCase::Bed9_1Oh,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalSpeaker {
    pub uri: String,
    pub vbap_xyz: [f32; 3],
    pub output_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownmixTarget {
    pub target_physical_index: usize,
    pub coefficient: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VirtualSpeaker {
    pub uri: String,
    pub downmix: Vec<DownmixTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    pub physical_speakers: Vec<PhysicalSpeaker>,
    #[serde(default)]
    pub virtual_speakers: Vec<VirtualSpeaker>,
    pub vbap_triangulation: Vec<[usize; 3]>,
    #[serde(default = "default_true")]
    pub smoothing_enabled: bool,
    #[serde(default = "default_true")]
    pub decorr_enabled: bool,
    pub target_soundfield: TargetSoundfield,
    /// Worker count for the optional multi-threaded renderer (§5); clamped to
    /// `[1, 8]` by [`crate::render::pool::WorkerPool::new`] regardless of what's
    /// configured here.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

fn default_true() -> bool {
    true
}

fn default_worker_count() -> usize {
    4
}

impl RendererConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading renderer config {}: {e}", path.display()))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let config: RendererConfig =
            serde_yaml_ng::from_str(text).map_err(|e| anyhow::anyhow!("parsing renderer config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.physical_speakers.is_empty() {
            anyhow::bail!("renderer config must list at least one physical speaker");
        }
        let n = self.physical_speakers.len();
        for (i, j, k) in self.vbap_triangulation.iter().map(|t| (t[0], t[1], t[2])) {
            if i >= n || j >= n || k >= n {
                anyhow::bail!("vbap_triangulation references speaker index out of range 0..{n}");
            }
        }
        Ok(())
    }

    /// The `UseCase` the renderer activates conditional elements against,
    /// derived from `target_soundfield` (§4.2/§4.5).
    pub fn target_use_case(&self) -> UseCase {
        self.target_soundfield.to_use_case()
    }

    pub fn output_count(&self) -> usize {
        self.physical_speakers
            .iter()
            .map(|s| s.output_index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn physical_by_uri(&self, uri: &str) -> Option<&PhysicalSpeaker> {
        self.physical_speakers.iter().find(|s| s.uri == uri)
    }

    pub fn virtual_by_uri(&self, uri: &str) -> Option<&VirtualSpeaker> {
        self.virtual_speakers.iter().find(|s| s.uri == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
physical_speakers:
  - uri: "urn:smpte:ul:L"
    vbap_xyz: [-1.0, 1.0, 0.0]
    output_index: 0
  - uri: "urn:smpte:ul:R"
    vbap_xyz: [1.0, 1.0, 0.0]
    output_index: 1
  - uri: "urn:smpte:ul:C"
    vbap_xyz: [0.0, 1.0, 0.0]
    output_index: 2
virtual_speakers: []
vbap_triangulation:
  - [0, 1, 2]
smoothing_enabled: true
decorr_enabled: false
target_soundfield: surround5_1
"#;

    #[test]
    fn parses_a_minimal_config() {
        let config = RendererConfig::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(config.physical_speakers.len(), 3);
        assert_eq!(config.output_count(), 3);
        assert!(!config.decorr_enabled);
        assert_eq!(config.worker_count, 4);
    }

    #[test]
    fn rejects_triangulation_referencing_unknown_speaker() {
        let bad = SAMPLE_YAML.replace("[0, 1, 2]", "[0, 1, 9]");
        assert!(RendererConfig::from_yaml(&bad).is_err());
    }

    #[test]
    fn rejects_empty_physical_speaker_list() {
        let bad = SAMPLE_YAML.replace(
            "physical_speakers:\n  - uri: \"urn:smpte:ul:L\"\n    vbap_xyz: [-1.0, 1.0, 0.0]\n    output_index: 0\n  - uri: \"urn:smpte:ul:R\"\n    vbap_xyz: [1.0, 1.0, 0.0]\n    output_index: 1\n  - uri: \"urn:smpte:ul:C\"\n    vbap_xyz: [0.0, 1.0, 0.0]\n    output_index: 2\n",
            "physical_speakers: []\n",
        );
        assert!(RendererConfig::from_yaml(&bad).is_err());
    }
}
