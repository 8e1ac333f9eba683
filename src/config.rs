//! JSON configuration.
//!
//! Every declarative input of an evaluation chain (skeleton, blend spaces,
//! masks, retarget profiles) can be written as JSON and loaded here. Files
//! are parsed with `serde_json`; the loaded descriptions are then validated
//! by the constructors they feed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sinew_animation::blend_space::{BlendSpace, BlendSpaceConfig};
use sinew_animation::mask::{BoneMaskSpec, MaskDefinition};
use sinew_animation::retarget::RetargetProfile;
use sinew_animation::skeleton::{Skeleton, SkeletonDesc};
use sinew_core::Result;

/// A named mask inside a [`CharacterConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMask {
    pub name: String,
    pub spec: BoneMaskSpec,
}

/// Everything one character needs, in a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub skeleton: SkeletonDesc,
    #[serde(default)]
    pub blend_spaces: Vec<BlendSpaceConfig>,
    #[serde(default)]
    pub masks: Vec<NamedMask>,
    #[serde(default)]
    pub retarget_profile: RetargetProfile,
}

/// A [`CharacterConfig`] turned into runtime objects.
#[derive(Debug)]
pub struct Character {
    pub skeleton: Arc<Skeleton>,
    pub blend_spaces: Vec<BlendSpace>,
    pub masks: Vec<(String, MaskDefinition)>,
    pub retarget_profile: RetargetProfile,
}

impl CharacterConfig {
    /// Validates and builds every part.
    pub fn build(self) -> Result<Character> {
        let skeleton = Arc::new(Skeleton::new(self.skeleton)?);
        let blend_spaces = self
            .blend_spaces
            .iter()
            .map(BlendSpace::from_config)
            .collect::<Result<Vec<_>>>()?;
        let masks: Vec<(String, MaskDefinition)> = self
            .masks
            .into_iter()
            .map(|mask| (mask.name, MaskDefinition::new(mask.spec)))
            .collect();

        log::debug!(
            "Character '{}' loaded: {} blend spaces, {} masks",
            skeleton.name(),
            blend_spaces.len(),
            masks.len()
        );

        Ok(Character {
            skeleton,
            blend_spaces,
            masks,
            retarget_profile: self.retarget_profile,
        })
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses any declarative type from a JSON string.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Reads and parses a JSON file.
pub fn from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    log::debug!("Loading config {}", path.display());
    let text = fs::read_to_string(path)?;
    from_json(&text)
}

pub fn load_skeleton(json: &str) -> Result<Skeleton> {
    Skeleton::new(from_json(json)?)
}

pub fn load_blend_space(json: &str) -> Result<BlendSpace> {
    let config: BlendSpaceConfig = from_json(json)?;
    BlendSpace::from_config(&config)
}

pub fn load_mask_spec(json: &str) -> Result<BoneMaskSpec> {
    from_json(json)
}

pub fn load_retarget_profile(json: &str) -> Result<RetargetProfile> {
    from_json(json)
}

pub fn load_character(json: &str) -> Result<Character> {
    from_json::<CharacterConfig>(json)?.build()
}

/// Serializes a declarative type back to pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
