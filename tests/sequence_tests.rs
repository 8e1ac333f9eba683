//! Sequence and Playback Tests
//!
//! Tests for:
//! - AnimationSequence ingestion checks (NaN keys, unknown bones)
//! - Sampling against LOD containers
//! - SequencePlayer loop modes (Once, Loop, PingPong)
//! - BlendList cross-fades driven by selectors
//! - CurveOutputs routing of the final curve buffer
//! - Component-space conversion for rendering

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::Arc;

use glam::{Quat, Vec3};

use sinew::BoneTransform;
use sinew::animation::BoneContainer;
use sinew::animation::arena::EvaluationArena;
use sinew::animation::blend_list::{BlendList, BoolSelector, IndexSelector};
use sinew::animation::curve::{CurveBuffer, CurveDesc, CurveFlags, CurveOutputs};
use sinew::animation::playback::{AdvanceResult, LoopMode, SequencePlayer};
use sinew::animation::pose::CompactPose;
use sinew::animation::sequence::{
    AnimationSequence, BoneTrack, CurveTrack, DiagnosticReason, InterpolationMode, KeyframeTrack, TrackChannel,
    TrackDefect,
};
use sinew::animation::skeleton::{BoneDesc, Skeleton, SkeletonDesc};
use sinew::animation::space::{BoneSpace, ComponentSpacePose, component_space_transforms, convert_to_component_space};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn arm_skeleton() -> Arc<Skeleton> {
    let step = BoneTransform::from_translation(Vec3::X);
    Arc::new(
        Skeleton::new(SkeletonDesc {
            name: "arm".to_string(),
            bones: vec![
                BoneDesc::new("root", None, BoneTransform::IDENTITY),
                BoneDesc::new("upper_arm", Some(0), step),
                BoneDesc::new("forearm", Some(1), step),
                BoneDesc::new("hand", Some(2), step),
                BoneDesc::new("finger", Some(3), step),
            ],
            curves: vec![
                CurveDesc::new("fist", CurveFlags::MORPH_TARGET),
                CurveDesc::new("tint", CurveFlags::MATERIAL),
                CurveDesc::new("grab", CurveFlags::EVENT | CurveFlags::MORPH_TARGET),
            ],
            lods: vec![vec!["forearm".to_string()]],
        })
        .unwrap(),
    )
}

fn swing_sequence(skeleton: &Arc<Skeleton>) -> Arc<AnimationSequence> {
    let track = BoneTrack::new("upper_arm").with_rotation(KeyframeTrack::linear(&[
        (0.0, Quat::IDENTITY),
        (2.0, Quat::from_rotation_z(FRAC_PI_2)),
    ]));
    let (sequence, diagnostics) = AnimationSequence::new("swing", Arc::clone(skeleton), vec![track], Vec::new());
    assert!(diagnostics.is_empty());
    Arc::new(sequence)
}

// ============================================================================
// Ingestion
// ============================================================================

#[test]
fn nan_track_is_dropped_with_diagnostic() {
    let skeleton = arm_skeleton();
    let good = BoneTrack::new("forearm").with_translation(KeyframeTrack::linear(&[
        (0.0, Vec3::X),
        (1.0, Vec3::new(2.0, 0.0, 0.0)),
    ]));
    let poisoned = BoneTrack::new("hand")
        .with_translation(KeyframeTrack::constant(Vec3::X))
        .with_rotation(KeyframeTrack::linear(&[
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0)),
        ]));

    let (sequence, diagnostics) = AnimationSequence::new("poisoned", Arc::clone(&skeleton), vec![good, poisoned], Vec::new());

    assert_eq!(sequence.bone_track_count(), 1);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].track, "hand");
    assert_eq!(diagnostics[0].channel, Some(TrackChannel::Rotation));
    assert_eq!(
        diagnostics[0].reason,
        DiagnosticReason::Defect(TrackDefect::NonFiniteKey { key_index: 1 })
    );

    // The dropped bone falls back to the reference pose
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let mut pose = CompactPose::identity(container.num_bones());
    let mut curves = CurveBuffer::for_table(skeleton.curves());
    sequence.sample(0.5, &container, None, &mut pose, &mut curves);

    assert!(pose.is_finite());
    assert_eq!(pose[3], skeleton.ref_pose()[3]);
    assert!(approx(pose[2].translation.x, 1.5));
}

#[test]
fn nan_curve_track_is_dropped() {
    let skeleton = arm_skeleton();
    let (sequence, diagnostics) = AnimationSequence::new(
        "curves",
        skeleton,
        Vec::new(),
        vec![CurveTrack::new("fist", CurveFlags::empty(), KeyframeTrack::constant(f32::INFINITY))],
    );

    assert_eq!(sequence.curve_track_count(), 0);
    assert_eq!(diagnostics[0].channel, Some(TrackChannel::Curve));
}

#[test]
fn mismatched_cubic_keys_are_rejected() {
    let track = KeyframeTrack::new(vec![0.0, 1.0], vec![0.0_f32, 1.0], InterpolationMode::CubicSpline);
    assert_eq!(
        track.validate(),
        Some(TrackDefect::MismatchedKeyCount { times: 2, values: 2 })
    );
}

#[test]
fn sampling_respects_lod_container() {
    let skeleton = arm_skeleton();
    let sequence = swing_sequence(&skeleton);
    let container = BoneContainer::new(Arc::clone(&skeleton), 1).unwrap();
    assert_eq!(container.num_bones(), 3);

    let mut pose = CompactPose::identity(container.num_bones());
    let mut curves = CurveBuffer::for_table(skeleton.curves());
    sequence.sample(2.0, &container, None, &mut pose, &mut curves);

    assert!(pose[1].rotation.abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), EPSILON));
}

// ============================================================================
// SequencePlayer
// ============================================================================

#[test]
fn player_loops() {
    let skeleton = arm_skeleton();
    let mut player = SequencePlayer::new(swing_sequence(&skeleton));

    assert_eq!(player.update(1.5), AdvanceResult::Default);
    assert_eq!(player.update(1.0), AdvanceResult::Looped);
    assert!(approx(player.time, 0.5));
}

#[test]
fn player_once_stops_at_end() {
    let skeleton = arm_skeleton();
    let mut player = SequencePlayer::new(swing_sequence(&skeleton));
    player.loop_mode = LoopMode::Once;

    assert_eq!(player.update(3.0), AdvanceResult::Finished);
    assert!(approx(player.time, 2.0));
    assert!(player.paused);
    assert_eq!(player.update(1.0), AdvanceResult::Default);
}

#[test]
fn player_ping_pong_reverses() {
    let skeleton = arm_skeleton();
    let mut player = SequencePlayer::new(swing_sequence(&skeleton));
    player.loop_mode = LoopMode::PingPong;

    player.update(1.5);
    player.update(1.0);
    // 2.5 into a 2 second sequence plays back to 1.5
    assert!(approx(player.time, 1.5));
}

#[test]
fn player_evaluates_at_current_time() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let mut player = SequencePlayer::new(swing_sequence(&skeleton));
    player.time_scale = 2.0;
    player.update(0.5);

    let mut pose = CompactPose::identity(container.num_bones());
    let mut curves = CurveBuffer::for_table(skeleton.curves());
    player.evaluate(&container, None, &mut pose, &mut curves);

    let expected = Quat::from_rotation_z(FRAC_PI_4);
    assert!(pose[1].rotation.abs_diff_eq(expected, 1e-4));
}

// ============================================================================
// BlendList
// ============================================================================

#[test]
fn blend_list_cross_fades_poses() {
    let a = CompactPose::from_transforms(vec![BoneTransform::from_translation(Vec3::ZERO)]);
    let b = CompactPose::from_transforms(vec![BoneTransform::from_translation(Vec3::new(4.0, 0.0, 0.0))]);
    let mut list = BlendList::new(vec![0.2, 0.4]);
    let mut out = CompactPose::identity(1);

    let mut selector = BoolSelector { value: true };
    list.update(&selector, 0.1);
    list.evaluate(&[&*a, &*b], &mut out);
    assert_eq!(out[0].translation, Vec3::ZERO);

    selector.value = false;
    list.update(&selector, 0.1);
    list.evaluate(&[&*a, &*b], &mut out);
    assert!(approx(out[0].translation.x, 1.0));

    list.update(&selector, 0.3);
    list.evaluate(&[&*a, &*b], &mut out);
    assert!(approx(out[0].translation.x, 4.0));
}

#[test]
fn blend_list_evaluates_only_relevant_children() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let arena = EvaluationArena::new();
    let mut list = BlendList::new(vec![0.0; 3]);
    list.update(&IndexSelector { index: 2 }, 0.1);

    let mut evaluated = Vec::new();
    let mut pose = CompactPose::identity(container.num_bones());
    let mut curves = CurveBuffer::for_table(skeleton.curves());
    list.evaluate_with(&container, &arena, &mut pose, &mut curves, |child, out_pose, _| {
        evaluated.push(child);
        out_pose[0].translation.y = 7.0;
    });

    assert_eq!(evaluated, vec![2]);
    assert!(approx(pose[0].translation.y, 7.0));
}

// ============================================================================
// Curve Outputs
// ============================================================================

#[test]
fn curve_outputs_route_by_flag() {
    let skeleton = arm_skeleton();
    let table = skeleton.curves();
    let mut buffer = CurveBuffer::for_table(table);
    buffer.set(table.uid("fist").unwrap(), 0.5, CurveFlags::empty());
    buffer.set(table.uid("tint").unwrap(), 0.25, CurveFlags::empty());
    buffer.set(table.uid("grab").unwrap(), 1.0, CurveFlags::empty());

    let outputs = CurveOutputs::from_buffer(&buffer, table);

    assert_eq!(outputs.morph_targets.get("fist"), Some(&0.5));
    assert_eq!(outputs.morph_targets.get("grab"), Some(&1.0));
    assert_eq!(outputs.material_parameters.get("tint"), Some(&0.25));
    assert_eq!(outputs.events.get("grab"), Some(&1.0));
    assert!(!outputs.events.contains_key("fist"));
}

#[test]
fn sequence_curves_reach_outputs() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let (sequence, _) = AnimationSequence::new(
        "clench",
        Arc::clone(&skeleton),
        Vec::new(),
        vec![CurveTrack::new(
            "fist",
            CurveFlags::empty(),
            KeyframeTrack::linear(&[(0.0, 0.0), (1.0, 1.0)]),
        )],
    );

    let mut pose = CompactPose::identity(container.num_bones());
    let mut curves = CurveBuffer::for_table(skeleton.curves());
    sequence.sample(0.75, &container, None, &mut pose, &mut curves);

    let outputs = CurveOutputs::from_buffer(&curves, skeleton.curves());
    assert!(approx(outputs.morph_targets["fist"], 0.75));
}

// ============================================================================
// Component Space
// ============================================================================

#[test]
fn component_space_follows_hierarchy() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let mut pose = CompactPose::from_ref_pose(&container);
    pose[1].rotation = Quat::from_rotation_z(FRAC_PI_2);

    let component = component_space_transforms(&pose, &container);

    // upper_arm at x=1, rotated; the chain continues along +Y
    assert!(component[1].translation.abs_diff_eq(Vec3::X, EPSILON));
    assert!(component[2].translation.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), EPSILON));
    assert!(component[4].translation.abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), EPSILON));
}

#[test]
fn set_component_space_moves_descendants() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let mut cs_pose = ComponentSpacePose::new(&container, CompactPose::from_ref_pose(&container));

    cs_pose.set_component_space(2, BoneTransform::from_translation(Vec3::new(2.0, 5.0, 0.0)));

    assert!(cs_pose.component_transform(3).translation.abs_diff_eq(Vec3::new(3.0, 5.0, 0.0), EPSILON));
    let local = cs_pose.to_local_pose();
    assert!(local[2].translation.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), EPSILON));
}

#[test]
fn parent_bone_space_converts_through_parent() {
    let skeleton = arm_skeleton();
    let container = BoneContainer::full(Arc::clone(&skeleton));
    let mut cs_pose = ComponentSpacePose::new(&container, CompactPose::from_ref_pose(&container));

    let offset = BoneTransform::from_translation(Vec3::new(0.0, 1.0, 0.0));
    let component = convert_to_component_space(&mut cs_pose, &offset, 3, BoneSpace::ParentBone);

    // forearm sits at x=2
    assert!(component.translation.abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), EPSILON));
}
