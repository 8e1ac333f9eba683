use std::sync::Arc;

use sinew_core::{BoneTransform, Result};

use crate::skeleton::Skeleton;

/// Dense, LOD-filtered view of a skeleton for one character instance.
///
/// Every pose evaluated for the instance is indexed by *compact* bone index:
/// position in this container. Compact order is ascending skeleton order, so
/// a bone's parent always has a smaller compact index.
#[derive(Debug, Clone)]
pub struct BoneContainer {
    skeleton: Arc<Skeleton>,
    lod: usize,
    skeleton_version: u64,

    // compact -> skeleton
    bone_indices: Vec<usize>,
    // skeleton -> compact
    compact_indices: Vec<Option<usize>>,
    parents: Vec<Option<usize>>,
    ref_pose: Vec<BoneTransform>,
}

impl BoneContainer {
    /// Builds the container for `lod`.
    pub fn new(skeleton: Arc<Skeleton>, lod: usize) -> Result<Self> {
        let mut container = Self {
            skeleton,
            lod,
            skeleton_version: 0,
            bone_indices: Vec::new(),
            compact_indices: Vec::new(),
            parents: Vec::new(),
            ref_pose: Vec::new(),
        };
        container.rebuild(lod)?;
        Ok(container)
    }

    /// Container covering every bone (LOD 0).
    #[must_use]
    pub fn full(skeleton: Arc<Skeleton>) -> Self {
        let count = skeleton.num_bones();
        let bone_indices: Vec<usize> = (0..count).collect();
        let compact_indices = (0..count).map(Some).collect();
        let parents = skeleton.parents().to_vec();
        let ref_pose = skeleton.ref_pose().to_vec();

        Self {
            skeleton_version: skeleton.version(),
            skeleton,
            lod: 0,
            bone_indices,
            compact_indices,
            parents,
            ref_pose,
        }
    }

    /// Switches LOD. Poses built against the old layout must be rebuilt.
    pub fn set_lod(&mut self, lod: usize) -> Result<()> {
        if lod == self.lod && self.skeleton_version == self.skeleton.version() {
            return Ok(());
        }
        self.rebuild(lod)
    }

    fn rebuild(&mut self, lod: usize) -> Result<()> {
        let skeleton = &self.skeleton;

        let mut bones = match skeleton.lod_required_bones(lod)? {
            Some(required) => required.to_vec(),
            None => (0..skeleton.num_bones()).collect(),
        };
        ensure_parents_present(&mut bones, skeleton);

        let mut compact_indices = vec![None; skeleton.num_bones()];
        for (compact, &bone) in bones.iter().enumerate() {
            compact_indices[bone] = Some(compact);
        }

        // Parents are present after the repair, so every lookup succeeds
        let parents = bones
            .iter()
            .map(|&bone| skeleton.parent(bone).and_then(|p| compact_indices[p]))
            .collect();
        let ref_pose = bones.iter().map(|&bone| skeleton.ref_pose()[bone]).collect();

        log::debug!(
            "BoneContainer for '{}' rebuilt at LOD {lod}: {} of {} bones",
            skeleton.name(),
            bones.len(),
            skeleton.num_bones()
        );

        self.skeleton_version = skeleton.version();
        self.lod = lod;
        self.bone_indices = bones;
        self.compact_indices = compact_indices;
        self.parents = parents;
        self.ref_pose = ref_pose;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    #[inline]
    #[must_use]
    pub fn lod(&self) -> usize {
        self.lod
    }

    /// Skeleton version this container was built from.
    #[inline]
    #[must_use]
    pub fn skeleton_version(&self) -> u64 {
        self.skeleton_version
    }

    #[inline]
    #[must_use]
    pub fn num_bones(&self) -> usize {
        self.bone_indices.len()
    }

    #[inline]
    #[must_use]
    pub fn bone_indices(&self) -> &[usize] {
        &self.bone_indices
    }

    #[inline]
    #[must_use]
    pub fn skeleton_index(&self, compact: usize) -> usize {
        self.bone_indices[compact]
    }

    #[inline]
    #[must_use]
    pub fn compact_index(&self, skeleton_bone: usize) -> Option<usize> {
        self.compact_indices.get(skeleton_bone).copied().flatten()
    }

    #[must_use]
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.skeleton
            .find_bone(name)
            .and_then(|bone| self.compact_index(bone))
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, compact: usize) -> Option<usize> {
        self.parents[compact]
    }

    #[inline]
    #[must_use]
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    #[inline]
    #[must_use]
    pub fn ref_pose(&self) -> &[BoneTransform] {
        &self.ref_pose
    }

    #[must_use]
    pub fn bone_name(&self, compact: usize) -> &str {
        self.skeleton.bone_name(self.bone_indices[compact])
    }
}

/// Adds every missing ancestor of `bones` and sorts the list ascending, so
/// parents precede children.
pub fn ensure_parents_present(bones: &mut Vec<usize>, skeleton: &Skeleton) {
    let mut present = vec![false; skeleton.num_bones()];
    for &bone in bones.iter() {
        present[bone] = true;
    }

    let mut cursor = 0;
    while cursor < bones.len() {
        let mut bone = bones[cursor];
        while let Some(parent) = skeleton.parent(bone) {
            if present[parent] {
                break;
            }
            present[parent] = true;
            bones.push(parent);
            bone = parent;
        }
        cursor += 1;
    }

    bones.sort_unstable();
    bones.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{BoneDesc, SkeletonDesc};
    use sinew_core::SinewError;

    fn skeleton() -> Arc<Skeleton> {
        let bones = vec![
            BoneDesc::new("root", None, BoneTransform::IDENTITY),
            BoneDesc::new("pelvis", Some(0), BoneTransform::IDENTITY),
            BoneDesc::new("spine", Some(1), BoneTransform::IDENTITY),
            BoneDesc::new("hand", Some(2), BoneTransform::IDENTITY),
            BoneDesc::new("finger", Some(3), BoneTransform::IDENTITY),
        ];
        Arc::new(
            Skeleton::new(SkeletonDesc {
                name: "test".into(),
                bones,
                lods: vec![vec!["spine".into(), "root".into()]],
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn lod_repairs_missing_parents() {
        let container = BoneContainer::new(skeleton(), 1).unwrap();
        // pelvis is added back, finger and hand are dropped
        assert_eq!(container.bone_indices(), &[0, 1, 2]);
        assert_eq!(container.parents(), &[None, Some(0), Some(1)]);
        assert!(container.compact_index(4).is_none());
    }

    #[test]
    fn set_lod_rebuilds() {
        let mut container = BoneContainer::full(skeleton());
        assert_eq!(container.num_bones(), 5);
        container.set_lod(1).unwrap();
        assert_eq!(container.num_bones(), 3);
        assert!(matches!(
            container.set_lod(4),
            Err(SinewError::InvalidLod { .. })
        ));
    }
}
