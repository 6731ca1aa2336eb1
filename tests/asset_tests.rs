//! Clip Cache Tests
//!
//! Tests for:
//! - Native `.anm` decoding through the cache and the file reader
//! - Interchange import with handedness conversion
//! - Deduplication under concurrent loads
//! - Background loading on a tokio runtime
//! - Failed loads: missing keys, empty curves, corrupt key times, unknown formats
//! - Validation of clips registered in memory

use std::sync::Arc;
use std::time::Duration;

use glam::{Affine3A, Quat, Vec3};

use rigmotion::animation::{
    AnimationClip, AnimationCurve, AnimationPlayer, InterpolationMode, NodeChannels,
};
use rigmotion::assets::{
    ClipCache, FileClipReader, Handedness, LoadState, MemoryClipReader, decode_native,
    encode_native,
};
use rigmotion::errors::{AssetError, Error};
use rigmotion::scene::Node;
use rigmotion::settings::AnimationSettings;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wave_clip() -> AnimationClip {
    AnimationClip::from_nodes(
        "wave",
        [
            (
                "shoulder".to_string(),
                NodeChannels::new(
                    AnimationCurve::constant(Vec3::ONE),
                    AnimationCurve::from_parts(
                        &[0.0, 1.0],
                        &[Quat::IDENTITY, Quat::from_rotation_x(0.5)],
                    ),
                    AnimationCurve::constant(Vec3::new(0.0, 1.5, 0.0)),
                    InterpolationMode::Linear,
                ),
            ),
            (
                "wrist".to_string(),
                NodeChannels::new(
                    AnimationCurve::from_parts(&[0.0, 0.5], &[Vec3::ONE, Vec3::splat(1.2)]),
                    AnimationCurve::constant(Quat::IDENTITY),
                    AnimationCurve::constant(Vec3::ZERO),
                    InterpolationMode::Linear,
                ),
            ),
        ],
    )
}

fn memory_cache() -> (Arc<MemoryClipReader>, ClipCache) {
    let reader = Arc::new(MemoryClipReader::new());
    let cache = ClipCache::new(reader.clone());
    (reader, cache)
}

// ============================================================================
// Native Format
// ============================================================================

#[test]
fn native_layout_starts_with_duration_and_node_count() {
    let bytes = encode_native(&wave_clip());
    let duration: f32 = bytemuck::pod_read_unaligned(&bytes[0..4]);
    let nodes: u64 = bytemuck::pod_read_unaligned(&bytes[4..12]);
    assert!((duration - 1.0).abs() < 1e-6);
    assert_eq!(nodes, 2);
    // names are written in order, so "shoulder" comes first
    let name_len: u64 = bytemuck::pod_read_unaligned(&bytes[12..20]);
    assert_eq!(&bytes[20..20 + name_len as usize], b"shoulder");
}

#[test]
fn native_clip_loads_through_cache() {
    init_logger();
    let (reader, cache) = memory_cache();
    reader.insert("wave.anm", encode_native(&wave_clip()));

    let handle = cache.load("wave.anm");
    assert_eq!(handle.state(), LoadState::Ready);
    let clip = handle.get().unwrap();
    assert_eq!(clip.name, "wave");
    assert_eq!(clip.nodes.len(), 2);
    assert_eq!(
        clip.node("wrist").unwrap().interpolation,
        InterpolationMode::Linear
    );
}

#[test]
fn native_clip_loads_from_disk() -> anyhow::Result<()> {
    init_logger();
    let dir = std::env::temp_dir().join(format!("rigmotion-assets-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    rigmotion::assets::write_native_file(dir.join("wave.anm"), &wave_clip())?;

    let cache = ClipCache::new(FileClipReader::new(&dir));
    let handle = cache.load("wave.anm");
    assert!(handle.is_loaded());
    assert_eq!(handle.get().map(|c| c.nodes.len()), Some(2));

    let missing = cache.load("nope.anm");
    assert!(missing.is_failed());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn empty_curve_is_a_load_failure() {
    init_logger();
    let mut clip = AnimationClip::new("hollow", 1.0);
    clip.insert_node(
        "hip",
        NodeChannels::new(
            AnimationCurve::constant(Vec3::ONE),
            AnimationCurve::default(),
            AnimationCurve::constant(Vec3::ZERO),
            InterpolationMode::Linear,
        ),
    );
    let bytes = encode_native(&clip);

    match decode_native("hollow", &bytes) {
        Err(Error::Asset(AssetError::EmptyCurve { node, .. })) => assert_eq!(node, "hip"),
        other => panic!("expected EmptyCurve, got {other:?}"),
    }

    let (reader, cache) = memory_cache();
    reader.insert("hollow.anm", bytes);
    let handle = cache.load("hollow.anm");
    assert_eq!(handle.state(), LoadState::Failed);
    assert!(handle.get().is_none());
}

/// One node, one key per channel, with `scale_time` as the scale key's time.
fn single_key_anm(scale_time: f32) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(bytemuck::bytes_of(&1.0_f32));
    bytes.extend_from_slice(bytemuck::bytes_of(&1_u64));
    bytes.extend_from_slice(bytemuck::bytes_of(&3_u64));
    bytes.extend_from_slice(b"hip");
    bytes.extend_from_slice(bytemuck::bytes_of(&1_u64));
    bytes.extend_from_slice(bytemuck::bytes_of(&scale_time));
    bytes.extend_from_slice(bytemuck::bytes_of(&[1.0_f32, 1.0, 1.0]));
    bytes.extend_from_slice(bytemuck::bytes_of(&1_u64));
    bytes.extend_from_slice(bytemuck::bytes_of(&0.0_f32));
    bytes.extend_from_slice(bytemuck::bytes_of(&[0.0_f32, 0.0, 0.0, 1.0]));
    bytes.extend_from_slice(bytemuck::bytes_of(&1_u64));
    bytes.extend_from_slice(bytemuck::bytes_of(&0.0_f32));
    bytes.extend_from_slice(bytemuck::bytes_of(&[0.0_f32, 0.0, 0.0]));
    bytes
}

#[test]
fn nan_key_time_is_a_load_failure() {
    init_logger();
    let (reader, cache) = memory_cache();
    reader.insert("nan.anm", single_key_anm(f32::NAN));
    reader.insert("finite.anm", single_key_anm(0.0));

    let handle = cache.load("nan.anm");
    assert_eq!(handle.state(), LoadState::Failed);

    // the entity keeps its rest pose instead of sampling the corrupt clip
    let player = AnimationPlayer::new(handle);
    let mut root = Node::new("hip");
    assert!(!player.compose_pose(&mut root, Affine3A::IDENTITY));
    assert_eq!(root.local_matrix, Affine3A::IDENTITY);

    assert!(cache.load("finite.anm").is_loaded());
}

#[test]
fn unsorted_key_times_are_a_load_failure() {
    init_logger();
    let mut clip = AnimationClip::new("shuffled", 1.0);
    clip.insert_node(
        "hip",
        NodeChannels::new(
            AnimationCurve::constant(Vec3::ONE),
            AnimationCurve::constant(Quat::IDENTITY),
            AnimationCurve::from_parts(&[0.0, 1.0, 0.5], &[Vec3::ZERO, Vec3::X, Vec3::Y]),
            InterpolationMode::Linear,
        ),
    );
    let (reader, cache) = memory_cache();
    reader.insert("shuffled.anm", encode_native(&clip));
    assert!(cache.load("shuffled.anm").is_failed());
}

#[test]
fn inserted_clip_with_empty_curve_is_failed() {
    init_logger();
    let mut clip = AnimationClip::new("hollow", 1.0);
    clip.insert_node(
        "hip",
        NodeChannels::new(
            AnimationCurve::default(),
            AnimationCurve::constant(Quat::IDENTITY),
            AnimationCurve::constant(Vec3::ZERO),
            InterpolationMode::Linear,
        ),
    );
    let (_reader, cache) = memory_cache();
    let handle = cache.insert("hollow", clip);
    assert!(handle.is_failed());
    assert!(cache.get("hollow").unwrap().ptr_eq(&handle));

    let mut player = AnimationPlayer::new(handle);
    player.play_start();
    player.update(0.5);
    let mut root = Node::new("hip");
    assert!(!player.compose_pose(&mut root, Affine3A::IDENTITY));
    assert_eq!(player.current_scale("hip"), Vec3::ONE);
}

#[test]
fn missing_key_fails_and_stays_cached() {
    init_logger();
    let (_reader, cache) = memory_cache();
    let first = cache.load("ghost.anm");
    let second = cache.load("ghost.anm");
    assert!(first.is_failed());
    assert!(first.ptr_eq(&second));
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// Interchange Import
// ============================================================================

const LEFT_HANDED_DOC: &str = r#"{
    "duration_ticks": 48.0,
    "ticks_per_second": 24.0,
    "handedness": "left_handed",
    "channels": [
        {
            "node": "spine",
            "interpolation": "Step",
            "scale_keys": [ { "time": 0.0, "value": [1.0, 1.0, 1.0] } ],
            "rotation_keys": [ { "time": 0.0, "value": [0.0, 0.0, 0.6, 0.8] } ],
            "position_keys": [
                { "time": 0.0, "value": [1.0, 2.0, 3.0] },
                { "time": 24.0, "value": [4.0, 5.0, 6.0] }
            ]
        }
    ]
}"#;

#[test]
fn interchange_document_is_converted() {
    init_logger();
    let (reader, cache) = memory_cache();
    reader.insert("lean.json", LEFT_HANDED_DOC.as_bytes().to_vec());

    let handle = cache.load("lean.json");
    let clip = handle.get().expect("interchange clip should load");
    assert_eq!(clip.name, "lean");
    assert!((clip.duration - 2.0).abs() < 1e-6);

    let spine = clip.node("spine").unwrap();
    assert_eq!(spine.interpolation, InterpolationMode::Step);
    assert_eq!(spine.translate.first().unwrap().value, Vec3::new(-1.0, 2.0, 3.0));
    assert!((spine.translate.last().unwrap().time - 1.0).abs() < 1e-6);
    assert_eq!(
        spine.rotate.first().unwrap().value,
        Quat::from_xyzw(0.0, 0.0, -0.6, 0.8)
    );
}

#[test]
fn matching_handedness_keeps_values() {
    let settings = AnimationSettings {
        import_handedness: Handedness::LeftHanded,
        ..AnimationSettings::default()
    };
    let reader = Arc::new(MemoryClipReader::new());
    let cache = ClipCache::with_settings(reader.clone(), &settings);
    reader.insert("lean.json", LEFT_HANDED_DOC.as_bytes().to_vec());

    let handle = cache.load("lean.json");
    let spine = handle.get().unwrap().node("spine").unwrap().clone();
    assert_eq!(spine.translate.first().unwrap().value, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn malformed_interchange_fails() {
    init_logger();
    let (reader, cache) = memory_cache();
    reader.insert("broken.json", b"{ \"channels\": 3 }".to_vec());
    assert!(cache.load("broken.json").is_failed());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_loads_share_one_handle() {
    init_logger();
    let (reader, cache) = memory_cache();
    reader.insert("wave.anm", encode_native(&wave_clip()));

    let handles: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| cache.load("wave.anm")))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    for handle in &handles {
        assert!(handle.ptr_eq(&handles[0]));
        // losers of the race may still be waiting on the winner's decode
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), LoadState::Ready);
    }
}

#[test]
fn background_load_completes() -> anyhow::Result<()> {
    init_logger();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()?;
    let (reader, cache) = memory_cache();
    reader.insert("wave.anm", encode_native(&wave_clip()));

    let handle = cache.load_background("wave.anm", runtime.handle());
    assert!(cache.contains("wave.anm"));
    assert_eq!(handle.wait_timeout(Duration::from_secs(5)), LoadState::Ready);
    assert!(cache.get("wave.anm").unwrap().ptr_eq(&handle));
    Ok(())
}

#[test]
fn async_load_returns_finished_handle() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()?;
    let (reader, cache) = memory_cache();
    reader.insert("wave.anm", encode_native(&wave_clip()));

    let handle = runtime.block_on(cache.load_async("wave.anm"));
    assert!(handle.is_loaded());

    let missing = runtime.block_on(cache.load_async("ghost.anm"));
    assert!(missing.is_failed());
    Ok(())
}

#[test]
fn inserted_clip_can_be_saved_and_reloaded() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("rigmotion-save-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let (_reader, cache) = memory_cache();
    cache.insert("wave", wave_clip());
    cache.save_native("wave", dir.join("wave.anm"))?;
    assert!(cache.save_native("absent", dir.join("absent.anm")).is_err());

    let disk = ClipCache::new(FileClipReader::new(&dir));
    let reloaded = disk.load("wave.anm");
    assert_eq!(reloaded.get().map(|c| c.nodes.len()), Some(2));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
