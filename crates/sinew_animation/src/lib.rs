//! Skeletal pose evaluation for Sinew.
//!
//! Poses are dense arrays of local-space [`BoneTransform`]s indexed through a
//! [`BoneContainer`]. Every operation here is a synchronous function over
//! such arrays: skeletons, containers, masks and blend-space grids are
//! immutable while poses are evaluated, so many characters can be evaluated
//! in parallel, each with its own [`EvaluationArena`].

pub mod additive;
pub mod arena;
pub mod blend;
pub mod blend_list;
pub mod blend_space;
pub mod bone_container;
pub mod curve;
pub mod mask;
pub mod playback;
pub mod pose;
pub mod retarget;
pub mod sequence;
pub mod skeleton;
pub mod space;

pub use additive::AdditiveMode;
pub use arena::EvaluationArena;
pub use blend_list::{ActiveChildSelector, BlendList, BoolSelector, EnumSelector, IndexSelector};
pub use blend_space::{
    BlendAxis, BlendSample, BlendSpace, BlendSpaceConfig, BlendSpacePlayer, BlendSpaceSampler,
    PoseSource, SampleWeight,
};
pub use bone_container::BoneContainer;
pub use curve::{CurveBuffer, CurveDesc, CurveFlags, CurveNameTable, CurveOutputs, CurveUid};
pub use mask::{BoneMask, BoneMaskSpec, BranchFilter, MaskBlendMode, MaskCache, MaskDefinition};
pub use playback::{AdvanceResult, LoopMode, SequencePlayer};
pub use pose::CompactPose;
pub use retarget::{BoneMapping, RetargetProfile, Retargeter, TranslationRetargetMode};
pub use sequence::{AnimationSequence, BoneTrack, CurveTrack, KeyframeTrack, SequenceLibrary, TrackDiagnostic};
pub use skeleton::{BoneDesc, Skeleton, SkeletonDesc};
pub use space::{BoneSpace, ComponentSpacePose};

pub use sinew_core::BoneTransform;
