use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sinew_core::{BoneTransform, ChangeTracker, Result, SinewError};
use uuid::Uuid;

use crate::curve::{CurveDesc, CurveNameTable};

/// One bone of a skeleton description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    /// Index of the parent bone; `None` for a root
    #[serde(default)]
    pub parent: Option<usize>,
    /// Reference-pose transform, local to the parent
    #[serde(default)]
    pub reference: BoneTransform,
}

impl BoneDesc {
    #[must_use]
    pub fn new(name: &str, parent: Option<usize>, reference: BoneTransform) -> Self {
        Self {
            name: name.to_string(),
            parent,
            reference,
        }
    }
}

/// Declarative skeleton, as produced by an asset importer or a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDesc {
    pub name: String,
    pub bones: Vec<BoneDesc>,
    #[serde(default)]
    pub curves: Vec<CurveDesc>,
    /// Required bone names per reduced LOD (LOD 1 first); LOD 0 is the full
    /// skeleton
    #[serde(default)]
    pub lods: Vec<Vec<String>>,
}

/// Bone hierarchy with its reference pose.
///
/// Read-only while poses are evaluated against it; share it with
/// `Arc<Skeleton>`. Offline edits go through `&mut self` and bump
/// [`version`](Self::version), which invalidates caches keyed on it.
#[derive(Debug)]
pub struct Skeleton {
    id: Uuid,
    name: String,

    // === Topology ===
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    name_to_index: FxHashMap<String, usize>,

    // === Reference pose ===
    ref_pose: Vec<BoneTransform>,
    // Derived from `ref_pose`, refreshed on every edit
    component_ref_pose: Vec<BoneTransform>,

    curves: CurveNameTable,
    lod_bones: Vec<Vec<usize>>,

    tracker: ChangeTracker,
}

impl Skeleton {
    /// Validates `desc` and builds the skeleton.
    ///
    /// Rejects empty bone lists, empty or duplicate names, parents that do not
    /// precede their children, non-finite reference transforms and LOD lists
    /// naming unknown bones.
    pub fn new(desc: SkeletonDesc) -> Result<Self> {
        let SkeletonDesc {
            name,
            bones,
            curves,
            lods,
        } = desc;

        if bones.is_empty() {
            return Err(SinewError::skeleton(&name, "no bones"));
        }

        let mut names = Vec::with_capacity(bones.len());
        let mut parents = Vec::with_capacity(bones.len());
        let mut ref_pose = Vec::with_capacity(bones.len());
        let mut name_to_index = FxHashMap::default();

        for (index, bone) in bones.into_iter().enumerate() {
            if bone.name.is_empty() {
                return Err(SinewError::skeleton(
                    &name,
                    format!("bone {index} has an empty name"),
                ));
            }
            if let Some(parent) = bone.parent
                && parent >= index
            {
                return Err(SinewError::skeleton(
                    &name,
                    format!(
                        "bone '{}' ({index}) has parent {parent}, parents must precede children",
                        bone.name
                    ),
                ));
            }
            if !bone.reference.is_finite() {
                return Err(SinewError::skeleton(
                    &name,
                    format!("bone '{}' has a non-finite reference transform", bone.name),
                ));
            }
            if name_to_index.insert(bone.name.clone(), index).is_some() {
                return Err(SinewError::skeleton(
                    &name,
                    format!("duplicate bone name '{}'", bone.name),
                ));
            }

            let mut reference = bone.reference;
            reference.normalize_rotation();

            names.push(bone.name);
            parents.push(bone.parent);
            ref_pose.push(reference);
        }

        let mut lod_bones = Vec::with_capacity(lods.len());
        for (level, required) in lods.iter().enumerate() {
            let mut indices = Vec::with_capacity(required.len());
            for bone_name in required {
                let Some(&index) = name_to_index.get(bone_name) else {
                    return Err(SinewError::skeleton(
                        &name,
                        format!("LOD {} requires unknown bone '{bone_name}'", level + 1),
                    ));
                };
                indices.push(index);
            }
            lod_bones.push(indices);
        }

        let mut skeleton = Self {
            id: Uuid::new_v4(),
            name,
            names,
            parents,
            name_to_index,
            component_ref_pose: Vec::new(),
            ref_pose,
            curves: CurveNameTable::new(&curves),
            lod_bones,
            tracker: ChangeTracker::new(),
        };
        skeleton.refresh_component_ref_pose();

        log::debug!(
            "Skeleton '{}' built: {} bones, {} curves, {} LODs",
            skeleton.name,
            skeleton.num_bones(),
            skeleton.curves.len(),
            skeleton.lod_count()
        );

        Ok(skeleton)
    }

    /// Shorthand for a skeleton without curves or reduced LODs.
    pub fn from_bones(name: &str, bones: Vec<BoneDesc>) -> Result<Self> {
        Self::new(SkeletonDesc {
            name: name.to_string(),
            bones,
            ..Default::default()
        })
    }

    fn refresh_component_ref_pose(&mut self) {
        self.component_ref_pose.clear();
        for (index, local) in self.ref_pose.iter().enumerate() {
            let component = match self.parents[index] {
                Some(parent) => self.component_ref_pose[parent].mul_transform(local),
                None => *local,
            };
            self.component_ref_pose.push(component);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bumped on every offline edit.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    #[inline]
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn bone_name(&self, bone: usize) -> &str {
        &self.names[bone]
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, bone: usize) -> Option<usize> {
        self.parents[bone]
    }

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Like [`find_bone`](Self::find_bone), reporting a missing name as an error.
    pub fn bone_index(&self, name: &str) -> Result<usize> {
        self.find_bone(name)
            .ok_or_else(|| SinewError::UnknownBone(name.to_string()))
    }

    #[inline]
    #[must_use]
    pub fn ref_pose(&self) -> &[BoneTransform] {
        &self.ref_pose
    }

    /// Reference pose composed down the hierarchy.
    #[inline]
    #[must_use]
    pub fn component_ref_pose(&self) -> &[BoneTransform] {
        &self.component_ref_pose
    }

    #[inline]
    #[must_use]
    pub fn curves(&self) -> &CurveNameTable {
        &self.curves
    }

    /// Number of LOD levels, LOD 0 included.
    #[inline]
    #[must_use]
    pub fn lod_count(&self) -> usize {
        self.lod_bones.len() + 1
    }

    /// Skeleton indices required at `lod`, as authored (unsorted, parents
    /// possibly missing). `None` for LOD 0, which requires every bone.
    pub fn lod_required_bones(&self, lod: usize) -> Result<Option<&[usize]>> {
        match lod {
            0 => Ok(None),
            _ => self
                .lod_bones
                .get(lod - 1)
                .map(|bones| Some(bones.as_slice()))
                .ok_or(SinewError::InvalidLod {
                    lod,
                    available: self.lod_count(),
                }),
        }
    }

    /// Number of generations from `ancestor` down to `bone`; `Some(0)` when
    /// they are the same bone, `None` when `ancestor` is not on the chain.
    #[must_use]
    pub fn depth_between(&self, bone: usize, ancestor: usize) -> Option<usize> {
        let mut current = bone;
        let mut depth = 0;
        loop {
            if current == ancestor {
                return Some(depth);
            }
            // Parents precede children, nothing below `ancestor` can reach it
            if current < ancestor {
                return None;
            }
            current = self.parents[current]?;
            depth += 1;
        }
    }

    // ========================================================================
    // Offline editing
    // ========================================================================

    /// Replaces one reference transform.
    pub fn set_ref_transform(&mut self, bone: usize, transform: BoneTransform) -> Result<()> {
        if bone >= self.num_bones() {
            return Err(SinewError::UnknownBone(format!("#{bone}")));
        }
        if !transform.is_finite() {
            return Err(SinewError::skeleton(
                &self.name,
                format!("non-finite reference transform for '{}'", self.names[bone]),
            ));
        }

        let mut transform = transform;
        transform.normalize_rotation();
        self.ref_pose[bone] = transform;
        self.refresh_component_ref_pose();
        self.tracker.changed();
        Ok(())
    }
}
