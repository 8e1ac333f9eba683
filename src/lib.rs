//! Sinew: skeletal pose blending, blend spaces and retargeting.
//!
//! This crate re-exports the workspace members:
//! - [`core`]: [`BoneTransform`] math, numeric thresholds, errors
//! - [`animation`]: skeletons, poses, curves, blenders, blend spaces,
//!   retargeting and keyframed sequences
//!
//! and adds JSON loading of the declarative inputs in [`config`].
//!
//! ```rust,ignore
//! use sinew::prelude::*;
//!
//! let skeleton = Arc::new(sinew::config::load_skeleton(json)?);
//! let container = BoneContainer::full(skeleton);
//! let mut pose = CompactPose::from_ref_pose(&container);
//! ```

pub mod config;

pub use sinew_animation as animation;
pub use sinew_core as core;

pub use sinew_animation::{
    AdditiveMode, AnimationSequence, BlendList, BlendSpace, BlendSpacePlayer, BoneContainer,
    BoneMaskSpec, BoneSpace, CompactPose, CurveBuffer, CurveOutputs, EvaluationArena,
    MaskBlendMode, MaskCache, MaskDefinition, PoseSource, RetargetProfile, Retargeter,
    SequenceLibrary, SequencePlayer, Skeleton, SkeletonDesc, TranslationRetargetMode,
};
pub use sinew_core::{BoneTransform, Result, SinewError};

/// Everything needed to build and evaluate an animation chain.
pub mod prelude {
    pub use std::sync::Arc;

    pub use glam::{Quat, Vec2, Vec3};

    pub use sinew_animation::additive::{accumulate_additive, to_additive};
    pub use sinew_animation::blend::{blend_many, blend_two};
    pub use sinew_animation::blend_list::{ActiveChildSelector, BlendList, BoolSelector, EnumSelector, IndexSelector};
    pub use sinew_animation::blend_space::{BlendAxis, BlendSpace, BlendSpacePlayer, BlendSpaceSampler, PoseSource};
    pub use sinew_animation::mask::{BoneMask, BoneMaskSpec, MaskBlendMode, MaskCache, MaskDefinition, blend_per_bone};
    pub use sinew_animation::space::{BoneSpace, ComponentSpacePose, component_space_transforms};
    pub use sinew_animation::{
        AdditiveMode, AnimationSequence, BoneContainer, BoneDesc, CompactPose, CurveBuffer, CurveOutputs,
        EvaluationArena, RetargetProfile, Retargeter, SequenceLibrary, SequencePlayer, Skeleton, SkeletonDesc,
        TranslationRetargetMode,
    };
    pub use sinew_core::{BoneTransform, Result, SinewError};
}
