//! Per-bone blend masks and the layered blend driven by them.

use serde::{Deserialize, Serialize};
use sinew_core::math::{is_weight_full, is_weight_zero};
use sinew_core::transform::{normalize_quat, quat_fast_lerp};
use sinew_core::{BoneTransform, ChangeTracker, MutGuard};
use uuid::Uuid;

use crate::arena::EvaluationArena;
use crate::bone_container::BoneContainer;

// ============================================================================
// Declarative mask
// ============================================================================

/// Selects a bone and its descendants, fading out over `falloff_depth`
/// generations. A depth of 0 selects the whole branch at full weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFilter {
    pub bone_name: String,
    #[serde(default)]
    pub falloff_depth: u32,
}

impl BranchFilter {
    #[must_use]
    pub fn new(bone_name: &str, falloff_depth: u32) -> Self {
        Self {
            bone_name: bone_name.to_string(),
            falloff_depth,
        }
    }

    /// Weight of a bone `depth` generations below the filter's root.
    #[must_use]
    pub fn weight_at_depth(&self, depth: usize) -> f32 {
        if self.falloff_depth == 0 {
            1.0
        } else {
            (1.0 - depth as f32 / self.falloff_depth as f32).max(0.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskLayer {
    pub branch_filters: Vec<BranchFilter>,
}

/// One layer per blended pose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneMaskSpec {
    pub layers: Vec<MaskLayer>,
}

impl BoneMaskSpec {
    /// Single-layer mask from one branch filter.
    #[must_use]
    pub fn branch(bone_name: &str, falloff_depth: u32) -> Self {
        Self {
            layers: vec![MaskLayer {
                branch_filters: vec![BranchFilter::new(bone_name, falloff_depth)],
            }],
        }
    }
}

/// A mask spec with an edit counter, so caches can tell when to rebuild.
#[derive(Debug, Clone, Default)]
pub struct MaskDefinition {
    spec: BoneMaskSpec,
    tracker: ChangeTracker,
}

impl MaskDefinition {
    #[must_use]
    pub fn new(spec: BoneMaskSpec) -> Self {
        Self {
            spec,
            tracker: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn spec(&self) -> &BoneMaskSpec {
        &self.spec
    }

    /// Mutable access; the version is bumped when the guard drops.
    pub fn spec_mut(&mut self) -> MutGuard<'_, BoneMaskSpec> {
        MutGuard::new(&mut self.spec, &mut self.tracker)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }
}

// ============================================================================
// Compiled mask
// ============================================================================

/// Which layer drives a bone, and how strongly.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerBoneWeight {
    pub source_index: usize,
    pub weight: f32,
}

/// Per-compact-bone weights compiled from a [`BoneMaskSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneMask {
    weights: Vec<PerBoneWeight>,
    layer_count: usize,
}

impl BoneMask {
    /// Compiles `spec` against a container.
    ///
    /// Filters of one layer combine by max; each bone is then assigned to the
    /// layer giving it the highest weight (the first one on ties). Filters
    /// naming unknown bones are skipped.
    #[must_use]
    pub fn build(spec: &BoneMaskSpec, container: &BoneContainer) -> Self {
        let skeleton = container.skeleton();
        let mut weights = vec![PerBoneWeight::default(); container.num_bones()];

        for (layer_index, layer) in spec.layers.iter().enumerate() {
            for filter in &layer.branch_filters {
                let Some(branch_root) = skeleton.find_bone(&filter.bone_name) else {
                    log::warn!(
                        "Mask filter bone '{}' not found in skeleton '{}', skipped",
                        filter.bone_name,
                        skeleton.name()
                    );
                    continue;
                };

                for (compact, entry) in weights.iter_mut().enumerate() {
                    let bone = container.skeleton_index(compact);
                    let Some(depth) = skeleton.depth_between(bone, branch_root) else {
                        continue;
                    };
                    let weight = filter.weight_at_depth(depth);
                    if weight > entry.weight {
                        *entry = PerBoneWeight {
                            source_index: layer_index,
                            weight,
                        };
                    }
                }
            }
        }

        Self {
            weights,
            layer_count: spec.layers.len(),
        }
    }

    #[must_use]
    pub fn from_weights(weights: Vec<PerBoneWeight>, layer_count: usize) -> Self {
        Self {
            weights,
            layer_count,
        }
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[PerBoneWeight] {
        &self.weights
    }

    #[inline]
    #[must_use]
    pub fn weight(&self, bone: usize) -> f32 {
        self.weights[bone].weight
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Applies per-layer runtime alphas to cached mask weights.
pub fn scale_mask(mask: &BoneMask, layer_alphas: &[f32], out: &mut Vec<PerBoneWeight>) {
    out.clear();
    out.extend(mask.weights().iter().map(|entry| PerBoneWeight {
        source_index: entry.source_index,
        weight: entry.weight * layer_alphas.get(entry.source_index).copied().unwrap_or(0.0),
    }));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MaskCacheKey {
    skeleton_id: Uuid,
    skeleton_version: u64,
    lod: usize,
    spec_version: u64,
}

/// Rebuilds a [`BoneMask`] only when the skeleton, LOD or spec changed.
#[derive(Debug, Clone, Default)]
pub struct MaskCache {
    key: Option<MaskCacheKey>,
    mask: BoneMask,
    rebuilds: u64,
}

impl MaskCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, definition: &MaskDefinition, container: &BoneContainer) -> &BoneMask {
        let key = MaskCacheKey {
            skeleton_id: container.skeleton().id(),
            skeleton_version: container.skeleton_version(),
            lod: container.lod(),
            spec_version: definition.version(),
        };

        if self.key != Some(key) {
            log::debug!(
                "Rebuilding bone mask for '{}' (LOD {}, spec v{})",
                container.skeleton().name(),
                key.lod,
                key.spec_version
            );
            self.mask = BoneMask::build(definition.spec(), container);
            self.key = Some(key);
            self.rebuilds += 1;
        }
        &self.mask
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// Number of times the mask has been compiled.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}

// ============================================================================
// Layered blend
// ============================================================================

/// How the rotations of masked bones are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskBlendMode {
    /// Rotations blended relative to the parent, like a two-way blend
    #[default]
    Local,
    /// Rotations blended in component space and re-localized against the
    /// blended parent
    MeshSpaceRotation,
}

/// Blends `layers` onto `base` bone by bone, each bone taking its layer and
/// weight from `weights`.
///
/// Translation and scale are always blended in local space. A bone whose
/// weight is zero, or whose layer index is out of range, keeps the base pose.
/// Mesh-space scratch rotations come from `arena`.
pub fn blend_per_bone(
    base: &[BoneTransform],
    layers: &[&[BoneTransform]],
    weights: &[PerBoneWeight],
    container: &BoneContainer,
    mode: MaskBlendMode,
    arena: &EvaluationArena,
    out: &mut [BoneTransform],
) {
    debug_assert_eq!(base.len(), out.len(), "blend output differs in length");
    debug_assert_eq!(base.len(), weights.len(), "mask does not match pose");
    debug_assert!(
        layers.iter().all(|layer| layer.len() == base.len()),
        "blend inputs differ in length"
    );

    match mode {
        MaskBlendMode::Local => {
            for (bone, entry) in weights.iter().enumerate() {
                out[bone] = match active_layer(*entry, layers.len()) {
                    None => base[bone],
                    Some((source, weight)) if is_weight_full(weight) => layers[source][bone],
                    Some((source, weight)) => base[bone].blend(&layers[source][bone], weight),
                };
            }
        }
        MaskBlendMode::MeshSpaceRotation => {
            blend_mesh_space_rotation(base, layers, weights, container, arena, out);
        }
    }
}

// Layer index and clamped weight, or None when the bone keeps the base pose
fn active_layer(entry: PerBoneWeight, layer_count: usize) -> Option<(usize, f32)> {
    let weight = entry.weight.clamp(0.0, 1.0);
    (!is_weight_zero(weight) && entry.source_index < layer_count).then_some((entry.source_index, weight))
}

fn blend_mesh_space_rotation(
    base: &[BoneTransform],
    layers: &[&[BoneTransform]],
    weights: &[PerBoneWeight],
    container: &BoneContainer,
    arena: &EvaluationArena,
    out: &mut [BoneTransform],
) {
    let len = base.len();
    let base_cs = arena.alloc_rotations(len);
    // Layer `i` occupies `[i * len, (i + 1) * len)`
    let layer_cs = arena.alloc_rotations(len * layers.len());
    let blended_cs = arena.alloc_rotations(len);

    for bone in 0..len {
        let parent = container.parent(bone);

        base_cs[bone] = match parent {
            Some(p) => base_cs[p] * base[bone].rotation,
            None => base[bone].rotation,
        };
        for (cs, layer) in layer_cs.chunks_exact_mut(len).zip(layers) {
            cs[bone] = match parent {
                Some(p) => cs[p] * layer[bone].rotation,
                None => layer[bone].rotation,
            };
        }

        let (rotation_cs, translation, scale) = match active_layer(weights[bone], layers.len()) {
            None => (base_cs[bone], base[bone].translation, base[bone].scale),
            Some((source, weight)) => {
                let layer = &layers[source][bone];
                let target_cs = layer_cs[source * len + bone];
                if is_weight_full(weight) {
                    (target_cs, layer.translation, layer.scale)
                } else {
                    (
                        normalize_quat(quat_fast_lerp(base_cs[bone], target_cs, weight)),
                        base[bone].translation.lerp(layer.translation, weight),
                        base[bone].scale.lerp(layer.scale, weight),
                    )
                }
            }
        };
        blended_cs[bone] = rotation_cs;

        let rotation = match parent {
            Some(p) => normalize_quat(blended_cs[p].inverse() * rotation_cs),
            None => rotation_cs,
        };
        out[bone] = BoneTransform::new(translation, rotation, scale);
    }
}
