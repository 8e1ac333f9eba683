use std::sync::Arc;

use rustc_hash::FxHashMap;
use sinew_core::BoneTransform;
use uuid::Uuid;

use super::AnimationSequence;
use crate::blend_space::PoseSource;
use crate::bone_container::BoneContainer;
use crate::curve::CurveBuffer;
use crate::retarget::Retargeter;

/// Named sequences plus the retargeters needed to play them on other
/// skeletons. Serves as the [`PoseSource`] of blend-space players.
#[derive(Debug, Default)]
pub struct SequenceLibrary {
    sequences: FxHashMap<String, Arc<AnimationSequence>>,
    // (source skeleton, target skeleton)
    retargeters: FxHashMap<(Uuid, Uuid), Arc<Retargeter>>,
}

impl SequenceLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sequence under its name, replacing any previous one.
    pub fn insert(&mut self, sequence: AnimationSequence) -> Arc<AnimationSequence> {
        let sequence = Arc::new(sequence);
        self.sequences
            .insert(sequence.name().to_string(), Arc::clone(&sequence));
        sequence
    }

    pub fn add_retargeter(&mut self, retargeter: Retargeter) {
        let key = (retargeter.source().id(), retargeter.target().id());
        self.retargeters.insert(key, Arc::new(retargeter));
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<AnimationSequence>> {
        self.sequences.get(name)
    }

    #[must_use]
    pub fn retargeter(&self, source: Uuid, target: Uuid) -> Option<&Arc<Retargeter>> {
        self.retargeters.get(&(source, target))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl PoseSource for SequenceLibrary {
    fn evaluate(
        &self,
        animation: &str,
        time: f32,
        container: &BoneContainer,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    ) {
        let Some(sequence) = self.sequences.get(animation) else {
            log::warn!("Sequence '{animation}' not found, using reference pose");
            out_pose.copy_from_slice(container.ref_pose());
            out_curves.reset();
            return;
        };

        let retargeter = self
            .retargeter(sequence.skeleton().id(), container.skeleton().id())
            .map(Arc::as_ref);
        sequence.sample(time, container, retargeter, out_pose, out_curves);
    }
}
