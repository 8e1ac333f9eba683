//! Keyframed animation sequences sampled into compact poses.

mod library;
mod tracks;
mod values;

use std::sync::Arc;

use glam::{Quat, Vec3};
use sinew_core::BoneTransform;
use sinew_core::transform::normalize_quat;

pub use library::SequenceLibrary;
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack, TrackDefect};
pub use values::Interpolatable;

use crate::bone_container::BoneContainer;
use crate::curve::{CurveBuffer, CurveFlags};
use crate::retarget::Retargeter;
use crate::skeleton::Skeleton;

/// Translation, rotation and scale keys of one bone, bound by name.
#[derive(Debug, Clone, Default)]
pub struct BoneTrack {
    pub bone_name: String,
    pub translation: Option<KeyframeTrack<Vec3>>,
    pub rotation: Option<KeyframeTrack<Quat>>,
    pub scale: Option<KeyframeTrack<Vec3>>,
}

impl BoneTrack {
    #[must_use]
    pub fn new(bone_name: &str) -> Self {
        Self {
            bone_name: bone_name.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_translation(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.translation = Some(track);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, track: KeyframeTrack<Quat>) -> Self {
        self.rotation = Some(track);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, track: KeyframeTrack<Vec3>) -> Self {
        self.scale = Some(track);
        self
    }

    fn end_time(&self) -> f32 {
        let t = self.translation.as_ref().map_or(0.0, KeyframeTrack::end_time);
        let r = self.rotation.as_ref().map_or(0.0, KeyframeTrack::end_time);
        let s = self.scale.as_ref().map_or(0.0, KeyframeTrack::end_time);
        t.max(r).max(s)
    }

    fn first_defect(&self) -> Option<(TrackChannel, TrackDefect)> {
        if let Some(defect) = self.translation.as_ref().and_then(KeyframeTrack::validate) {
            return Some((TrackChannel::Translation, defect));
        }
        if let Some(defect) = self.rotation.as_ref().and_then(KeyframeTrack::validate) {
            return Some((TrackChannel::Rotation, defect));
        }
        self.scale
            .as_ref()
            .and_then(KeyframeTrack::validate)
            .map(|defect| (TrackChannel::Scale, defect))
    }
}

/// Scalar keys of one named curve.
#[derive(Debug, Clone)]
pub struct CurveTrack {
    pub name: String,
    pub flags: CurveFlags,
    pub track: KeyframeTrack<f32>,
}

impl CurveTrack {
    #[must_use]
    pub fn new(name: &str, flags: CurveFlags, track: KeyframeTrack<f32>) -> Self {
        Self {
            name: name.to_string(),
            flags,
            track,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackChannel {
    Translation,
    Rotation,
    Scale,
    Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticReason {
    /// The keys failed validation
    Defect(TrackDefect),
    /// The track names a bone the skeleton does not have
    UnknownBone,
}

/// A track dropped while building a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDiagnostic {
    /// Bone or curve name of the dropped track
    pub track: String,
    pub channel: Option<TrackChannel>,
    pub reason: DiagnosticReason,
}

#[derive(Debug, Clone)]
struct BoundBoneTrack {
    // Skeleton bone index
    bone: usize,
    track: BoneTrack,
}

/// Per-player sampling cursors of one sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceCursors {
    bones: Vec<[KeyframeCursor; 3]>,
    curves: Vec<KeyframeCursor>,
}

impl SequenceCursors {
    #[must_use]
    pub fn for_sequence(sequence: &AnimationSequence) -> Self {
        Self {
            bones: vec![[KeyframeCursor::default(); 3]; sequence.bone_tracks.len()],
            curves: vec![KeyframeCursor::default(); sequence.curve_tracks.len()],
        }
    }

    fn fit(&mut self, sequence: &AnimationSequence) {
        if self.bones.len() != sequence.bone_tracks.len() || self.curves.len() != sequence.curve_tracks.len() {
            *self = Self::for_sequence(sequence);
        }
    }
}

/// Keyframed bone and curve tracks authored against one skeleton.
///
/// Tracks are validated when the sequence is built: a track with any
/// non-finite key, unsorted times or a mismatched key count is dropped as a
/// whole and reported as a [`TrackDiagnostic`].
#[derive(Debug, Clone)]
pub struct AnimationSequence {
    name: String,
    skeleton: Arc<Skeleton>,
    length: f32,
    bone_tracks: Vec<BoundBoneTrack>,
    curve_tracks: Vec<CurveTrack>,
}

impl AnimationSequence {
    /// Binds and validates the tracks. The length is the last key time over
    /// every kept track.
    #[must_use]
    pub fn new(
        name: &str,
        skeleton: Arc<Skeleton>,
        bone_tracks: Vec<BoneTrack>,
        curve_tracks: Vec<CurveTrack>,
    ) -> (Self, Vec<TrackDiagnostic>) {
        let mut diagnostics = Vec::new();

        let mut bound = Vec::with_capacity(bone_tracks.len());
        for track in bone_tracks {
            let Some(bone) = skeleton.find_bone(&track.bone_name) else {
                diagnostics.push(TrackDiagnostic {
                    track: track.bone_name,
                    channel: None,
                    reason: DiagnosticReason::UnknownBone,
                });
                continue;
            };
            if let Some((channel, defect)) = track.first_defect() {
                diagnostics.push(TrackDiagnostic {
                    track: track.bone_name,
                    channel: Some(channel),
                    reason: DiagnosticReason::Defect(defect),
                });
                continue;
            }
            bound.push(BoundBoneTrack { bone, track });
        }

        let mut curves = Vec::with_capacity(curve_tracks.len());
        for curve in curve_tracks {
            if let Some(defect) = curve.track.validate() {
                diagnostics.push(TrackDiagnostic {
                    track: curve.name,
                    channel: Some(TrackChannel::Curve),
                    reason: DiagnosticReason::Defect(defect),
                });
                continue;
            }
            curves.push(curve);
        }

        for diagnostic in &diagnostics {
            log::warn!(
                "Sequence '{name}': dropped track '{}' ({:?}): {:?}",
                diagnostic.track,
                diagnostic.channel,
                diagnostic.reason
            );
        }

        let length = bound
            .iter()
            .map(|b| b.track.end_time())
            .chain(curves.iter().map(|c| c.track.end_time()))
            .fold(0.0_f32, f32::max);

        let sequence = Self {
            name: name.to_string(),
            skeleton,
            length,
            bone_tracks: bound,
            curve_tracks: curves,
        };
        (sequence, diagnostics)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Skeleton the tracks were authored against.
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Duration in seconds.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    #[must_use]
    pub fn bone_track_count(&self) -> usize {
        self.bone_tracks.len()
    }

    #[must_use]
    pub fn curve_track_count(&self) -> usize {
        self.curve_tracks.len()
    }

    /// Samples without cursor state (binary search per track).
    pub fn sample(
        &self,
        time: f32,
        container: &BoneContainer,
        retargeter: Option<&Retargeter>,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    ) {
        let mut cursors = SequenceCursors::for_sequence(self);
        self.sample_with_cursors(time, &mut cursors, container, retargeter, out_pose, out_curves);
    }

    /// Samples the pose at `time` into `out_pose` and the curves into
    /// `out_curves`.
    ///
    /// Bones without a track keep the reference pose. When `container`
    /// belongs to another skeleton, the pose is sampled on the authored
    /// skeleton and passed through `retargeter`; without a matching
    /// retargeter the result is the reference pose.
    pub fn sample_with_cursors(
        &self,
        time: f32,
        cursors: &mut SequenceCursors,
        container: &BoneContainer,
        retargeter: Option<&Retargeter>,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    ) {
        debug_assert_eq!(out_pose.len(), container.num_bones(), "pose does not match container");
        cursors.fit(self);

        if container.skeleton().id() == self.skeleton.id() {
            out_pose.copy_from_slice(container.ref_pose());
            self.sample_bones(time, cursors, container, out_pose);
        } else {
            match retargeter {
                Some(retargeter)
                    if retargeter.source().id() == self.skeleton.id()
                        && retargeter.target().id() == container.skeleton().id() =>
                {
                    let source_container = retargeter.source_container();
                    let mut source_pose = source_container.ref_pose().to_vec();
                    self.sample_bones(time, cursors, source_container, &mut source_pose);
                    retargeter.retarget_pose(&source_pose, source_container, container, out_pose);
                }
                _ => {
                    log::warn!(
                        "Sequence '{}' authored on '{}' has no retargeter for '{}', using reference pose",
                        self.name,
                        self.skeleton.name(),
                        container.skeleton().name()
                    );
                    out_pose.copy_from_slice(container.ref_pose());
                }
            }
        }

        self.sample_curves(time, cursors, container, out_curves);
    }

    fn sample_bones(
        &self,
        time: f32,
        cursors: &mut SequenceCursors,
        container: &BoneContainer,
        out_pose: &mut [BoneTransform],
    ) {
        for (bound, cursor) in self.bone_tracks.iter().zip(cursors.bones.iter_mut()) {
            let Some(compact) = container.compact_index(bound.bone) else {
                continue;
            };
            let target = &mut out_pose[compact];
            let [t_cursor, r_cursor, s_cursor] = cursor;

            if let Some(value) = bound
                .track
                .translation
                .as_ref()
                .and_then(|track| track.sample_with_cursor(time, t_cursor))
            {
                target.translation = value;
            }
            if let Some(value) = bound
                .track
                .rotation
                .as_ref()
                .and_then(|track| track.sample_with_cursor(time, r_cursor))
            {
                target.rotation = normalize_quat(value);
            }
            if let Some(value) = bound
                .track
                .scale
                .as_ref()
                .and_then(|track| track.sample_with_cursor(time, s_cursor))
            {
                target.scale = value;
            }
        }
    }

    // Curves are matched by name against the container skeleton's table
    fn sample_curves(
        &self,
        time: f32,
        cursors: &mut SequenceCursors,
        container: &BoneContainer,
        out_curves: &mut CurveBuffer,
    ) {
        out_curves.reset();
        let table = container.skeleton().curves();

        for (curve, cursor) in self.curve_tracks.iter().zip(cursors.curves.iter_mut()) {
            let Some(uid) = table.uid(&curve.name) else {
                continue;
            };
            if let Some(value) = curve.track.sample_with_cursor(time, cursor) {
                out_curves.set(uid, value, curve.flags | table.flags(uid));
            }
        }
    }
}
