//! Blend throughput on a 64-bone chain.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec2, Vec3};

use sinew::BoneTransform;
use sinew::animation::arena::EvaluationArena;
use sinew::animation::blend::{blend_many, blend_two};
use sinew::animation::blend_space::{BlendAxis, BlendSample, BlendSpace, BlendSpacePlayer};
use sinew::animation::curve::CurveBuffer;
use sinew::animation::mask::{BoneMask, BoneMaskSpec, MaskBlendMode, blend_per_bone};
use sinew::animation::pose::CompactPose;
use sinew::animation::sequence::{AnimationSequence, BoneTrack, KeyframeTrack, SequenceLibrary};
use sinew::animation::skeleton::{BoneDesc, Skeleton};
use sinew::animation::BoneContainer;

const BONES: usize = 64;

fn chain() -> Arc<Skeleton> {
    let bones = (0..BONES)
        .map(|i| {
            let parent = i.checked_sub(1);
            BoneDesc::new(&format!("bone_{i}"), parent, BoneTransform::from_translation(Vec3::Y))
        })
        .collect();
    Arc::new(Skeleton::from_bones("chain", bones).unwrap())
}

fn posed(rotation: Quat) -> CompactPose {
    CompactPose::from_transforms(vec![BoneTransform::from_rotation_translation(rotation, Vec3::Y); BONES])
}

fn bench_blend_two(c: &mut Criterion) {
    let a = posed(Quat::from_rotation_x(0.3));
    let b = posed(Quat::from_rotation_z(-0.8));
    let mut out = CompactPose::identity(BONES);

    c.bench_function("blend_two", |bench| {
        bench.iter(|| blend_two(black_box(&a), black_box(&b), black_box(0.37), &mut out));
    });
}

fn bench_blend_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_many");
    for count in [2_usize, 4, 8] {
        let poses: Vec<CompactPose> = (0..count)
            .map(|i| posed(Quat::from_rotation_y(i as f32 * 0.4)))
            .collect();
        let refs: Vec<&[BoneTransform]> = poses.iter().map(|pose| &**pose).collect();
        let weights = vec![1.0 / count as f32; count];
        let mut out = CompactPose::identity(BONES);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |bench, _| {
            bench.iter(|| blend_many(black_box(&refs), black_box(&weights), &mut out));
        });
    }
    group.finish();
}

fn bench_masked_blend(c: &mut Criterion) {
    let container = BoneContainer::full(chain());
    let mask = BoneMask::build(&BoneMaskSpec::branch("bone_16", 24), &container);
    let base = posed(Quat::from_rotation_x(0.2));
    let layer = posed(Quat::from_rotation_z(0.9));
    let mut out = CompactPose::identity(BONES);
    let mut arena = EvaluationArena::new();

    let mut group = c.benchmark_group("blend_per_bone");
    for mode in [MaskBlendMode::Local, MaskBlendMode::MeshSpaceRotation] {
        group.bench_function(format!("{mode:?}"), |bench| {
            bench.iter(|| {
                blend_per_bone(&base, &[&*layer], mask.weights(), &container, mode, &arena, &mut out);
                arena.reset();
            });
        });
    }
    group.finish();
}

fn bench_blend_space(c: &mut Criterion) {
    let skeleton = chain();
    let container = BoneContainer::full(Arc::clone(&skeleton));

    let mut library = SequenceLibrary::new();
    let mut samples = Vec::new();
    for (i, speed) in [0.0_f32, 1.5, 3.0, 6.0].into_iter().enumerate() {
        let name = format!("move_{i}");
        let tracks = (0..BONES)
            .step_by(2)
            .map(|bone| {
                BoneTrack::new(&format!("bone_{bone}")).with_rotation(KeyframeTrack::linear(&[
                    (0.0, Quat::IDENTITY),
                    (0.5, Quat::from_rotation_x(speed * 0.1)),
                    (1.0, Quat::IDENTITY),
                ]))
            })
            .collect();
        let (sequence, _) = AnimationSequence::new(&name, Arc::clone(&skeleton), tracks, Vec::new());
        library.insert(sequence);
        samples.push(BlendSample::new(&name, 1.0, Vec2::new(speed, 0.0)));
    }
    let space = BlendSpace::new("locomotion", vec![BlendAxis::new("speed", 0.0, 6.0)], samples).unwrap();

    let mut player = BlendSpacePlayer::new(&space);
    let mut arena = EvaluationArena::new();
    let mut pose = CompactPose::from_ref_pose(&container);
    let mut curves = CurveBuffer::for_table(skeleton.curves());

    c.bench_function("blend_space_tick", |bench| {
        bench.iter(|| {
            player.update(&space, black_box(Vec2::new(2.2, 0.0)), 1.0 / 60.0);
            player.evaluate(&space, &library, &container, &arena, &mut pose, &mut curves);
            arena.reset();
        });
    });
}

criterion_group!(
    benches,
    bench_blend_two,
    bench_blend_many,
    bench_masked_blend,
    bench_blend_space
);
criterion_main!(benches);
