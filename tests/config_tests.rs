//! Configuration Tests
//!
//! Tests for:
//! - JSON loading of skeletons, blend spaces, masks and retarget profiles
//! - Character bundles built in one call
//! - Error reporting for malformed JSON, invalid content and missing files

use std::fs;

use glam::Vec3;

use sinew::SinewError;
use sinew::animation::curve::CurveFlags;
use sinew::animation::mask::BoneMask;
use sinew::animation::retarget::TranslationRetargetMode;
use sinew::animation::skeleton::SkeletonDesc;
use sinew::animation::BoneContainer;
use sinew::config::{self, CharacterConfig};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const SKELETON_JSON: &str = r#"{
    "name": "humanoid",
    "bones": [
        { "name": "pelvis" },
        { "name": "spine", "parent": 0, "reference": { "translation": [0.0, 0.2, 0.0] } },
        { "name": "head", "parent": 1, "reference": { "translation": [0.0, 0.5, 0.0] } },
        { "name": "thigh_l", "parent": 0, "reference": { "translation": [0.1, -0.1, 0.0] } }
    ],
    "curves": [
        { "name": "blink", "flags": "MORPH_TARGET" },
        { "name": "step", "flags": "EVENT" }
    ],
    "lods": [["spine"]]
}"#;

// ============================================================================
// Individual loaders
// ============================================================================

#[test]
fn load_skeleton_from_json() {
    init_logger();
    let skeleton = config::load_skeleton(SKELETON_JSON).unwrap();

    assert_eq!(skeleton.name(), "humanoid");
    assert_eq!(skeleton.num_bones(), 4);
    assert_eq!(skeleton.parent(3), Some(0));
    assert_eq!(skeleton.lod_count(), 2);
    assert!(approx(skeleton.ref_pose()[2].translation.y, 0.5));
    // Omitted reference transform is the identity
    assert_eq!(skeleton.ref_pose()[0].scale, Vec3::ONE);

    let table = skeleton.curves();
    let blink = table.uid("blink").unwrap();
    assert_eq!(table.flags(blink), CurveFlags::MORPH_TARGET);
}

#[test]
fn load_blend_space_from_json() {
    let json = r#"{
        "name": "walk_run",
        "axes": [{ "name": "speed", "min": 0.0, "max": 6.0 }],
        "samples": [
            { "animation": "walk", "length": 1.0, "x": 1.5 },
            { "animation": "run", "length": 0.8, "x": 6.0, "rate_scale": 1.25 }
        ],
        "target_weight_interpolation_speed": 4.0
    }"#;

    let space = config::load_blend_space(json).unwrap();
    assert_eq!(space.dimensions(), 1);
    assert_eq!(space.samples().len(), 2);
    assert!(approx(space.samples()[1].rate_scale, 1.25));
    assert!(approx(space.target_weight_interpolation_speed(), 4.0));
}

#[test]
fn load_mask_spec_compiles_against_container() {
    let skeleton = std::sync::Arc::new(config::load_skeleton(SKELETON_JSON).unwrap());
    let container = BoneContainer::full(skeleton);
    let spec = config::load_mask_spec(
        r#"{ "layers": [{ "branch_filters": [{ "bone_name": "spine", "falloff_depth": 2 }] }] }"#,
    )
    .unwrap();

    let mask = BoneMask::build(&spec, &container);
    assert!(approx(mask.weight(0), 0.0));
    assert!(approx(mask.weight(1), 1.0));
    assert!(approx(mask.weight(2), 0.5));
    assert!(approx(mask.weight(3), 0.0));
}

#[test]
fn load_retarget_profile_from_json() {
    let profile = config::load_retarget_profile(
        r#"{ "bone_modes": { "pelvis": "AnimationScaled", "spine": "Skeleton" } }"#,
    )
    .unwrap();

    assert_eq!(
        profile.bone_modes.get("pelvis"),
        Some(&TranslationRetargetMode::AnimationScaled)
    );
    assert_eq!(profile.bone_modes.get("spine"), Some(&TranslationRetargetMode::Skeleton));
}

#[test]
fn skeleton_desc_survives_serialization() {
    let desc: SkeletonDesc = config::from_json(SKELETON_JSON).unwrap();
    let json = config::to_json(&desc).unwrap();
    let reparsed: SkeletonDesc = config::from_json(&json).unwrap();
    assert_eq!(desc, reparsed);
}

// ============================================================================
// Character bundle
// ============================================================================

#[test]
fn load_character_builds_every_part() {
    init_logger();
    let json = format!(
        r#"{{
            "skeleton": {SKELETON_JSON},
            "blend_spaces": [{{
                "name": "idle_only",
                "axes": [{{ "name": "speed", "min": 0.0, "max": 1.0 }}],
                "samples": [{{ "animation": "idle", "length": 2.0, "x": 0.0 }}]
            }}],
            "masks": [{{ "name": "upper", "spec": {{ "layers": [{{ "branch_filters": [{{ "bone_name": "spine" }}] }}] }} }}],
            "retarget_profile": {{ "bone_modes": {{ "pelvis": "AnimationScaled" }} }}
        }}"#
    );

    let character = config::load_character(&json).unwrap();
    assert_eq!(character.skeleton.num_bones(), 4);
    assert_eq!(character.blend_spaces.len(), 1);
    assert_eq!(character.masks.len(), 1);
    assert_eq!(character.masks[0].0, "upper");
    assert_eq!(
        character.retarget_profile.resolve(&character.skeleton),
        vec![TranslationRetargetMode::AnimationScaled; 4]
    );
}

#[test]
fn character_defaults_optional_sections() {
    let json = format!(r#"{{ "skeleton": {SKELETON_JSON} }}"#);
    let config: CharacterConfig = config::from_json(&json).unwrap();
    assert!(config.blend_spaces.is_empty());
    assert!(config.masks.is_empty());

    let character = config.build().unwrap();
    assert!(character.retarget_profile.bone_modes.is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn malformed_json_is_config_error() {
    let err = config::load_skeleton("{ \"name\": ").unwrap_err();
    assert!(matches!(err, SinewError::Config(_)));
}

#[test]
fn invalid_topology_is_skeleton_error() {
    let json = r#"{ "name": "broken", "bones": [{ "name": "a", "parent": 0 }] }"#;
    let err = config::load_skeleton(json).unwrap_err();
    assert!(matches!(err, SinewError::InvalidSkeleton { .. }));
}

#[test]
fn invalid_blend_space_is_rejected() {
    let json = r#"{
        "name": "flat",
        "axes": [{ "name": "speed", "min": 1.0, "max": 1.0 }],
        "samples": [{ "animation": "idle", "x": 1.0 }]
    }"#;
    let err = config::load_blend_space(json).unwrap_err();
    assert!(matches!(err, SinewError::InvalidBlendSpace { .. }));
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("sinew_config_tests_missing.json");
    let _ = fs::remove_file(&path);
    let err = config::from_file::<SkeletonDesc>(&path).unwrap_err();
    assert!(matches!(err, SinewError::Io(_)));
}

#[test]
fn load_from_file() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!("sinew_config_tests_{}.json", std::process::id()));
    fs::write(&path, SKELETON_JSON)?;

    let desc: SkeletonDesc = config::from_file(&path)?;
    fs::remove_file(&path)?;

    assert_eq!(desc.bones.len(), 4);
    assert_eq!(desc.lods, vec![vec!["spine".to_string()]]);
    Ok(())
}
