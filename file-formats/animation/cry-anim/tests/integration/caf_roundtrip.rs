//! End-to-end tests for animation file round-trips

use cry_anim::caf::{CafFile, ControllerEncoding};
use cry_anim::chunks::motion_params::{AssetFlags, MotionParams};
use cry_anim::pqlog::quat_log;
use cry_anim::track::{KeyframeTrack, PqLogKey};
use glam::{Quat, Vec3};

fn build_track(id: u32, phase: f32) -> KeyframeTrack {
    let times: Vec<i32> = vec![0, 3, 9, 10, 27, 40];
    let keys: Vec<PqLogKey> = times
        .iter()
        .enumerate()
        .map(|(i, t)| PqLogKey {
            rot_log: quat_log(Quat::from_rotation_y(phase + *t as f32 * 0.05)),
            pos: Vec3::new(i as f32 * 0.25, phase, 0.0),
        })
        .collect();
    KeyframeTrack::new(id, times, keys).unwrap()
}

fn build_caf() -> CafFile {
    let params = MotionParams {
        flags: AssetFlags::LOADED | AssetFlags::CREATED,
        compression: 0,
        ticks_per_frame: 160,
        secs_per_tick: 1.0 / 4800.0,
        start: 0,
        end: 40,
        move_speed: 2.25,
    };
    CafFile::new(
        Some(params),
        vec![build_track(0x300, 0.5), build_track(0x100, 0.0), build_track(0x200, 0.25)],
    )
}

#[test]
fn test_save_load_decode_matches_both_encodings() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let caf = build_caf();

    for (name, encoding) in [
        ("legacy.caf", ControllerEncoding::Legacy),
        ("parallel.caf", ControllerEncoding::Parallel),
    ] {
        let path = dir.path().join(name);
        caf.save(&path, encoding).unwrap();

        let mut reloaded = CafFile::load(&path).unwrap();
        assert_eq!(reloaded.controllers().len(), 3);
        assert_eq!(reloaded.flags(), AssetFlags::LOADED | AssetFlags::CREATED);

        let mut original = caf.clone();
        for id in [0x100u32, 0x200, 0x300] {
            // all control-point times plus interior and out-of-range queries
            for t in [0.0f32, 3.0, 9.0, 10.0, 27.0, 40.0, 5.5, 33.3, -4.0, 99.0] {
                let a = original.controller_by_id_mut(id).unwrap().decode_key(t);
                let b = reloaded.controller_by_id_mut(id).unwrap().decode_key(t);
                assert_eq!(
                    a.q.to_array(),
                    b.q.to_array(),
                    "rotation mismatch for controller 0x{id:x} at t={t}"
                );
                assert_eq!(
                    a.t.to_array(),
                    b.t.to_array(),
                    "position mismatch for controller 0x{id:x} at t={t}"
                );
            }
        }
    }
}

#[test]
fn test_controllers_sorted_after_load() {
    let caf = build_caf();
    let ids: Vec<u32> = caf
        .controllers()
        .iter()
        .map(KeyframeTrack::controller_id)
        .collect();
    assert_eq!(ids, vec![0x100, 0x200, 0x300]);
    assert!(caf.controller_by_id(0x250).is_none());
}

#[test]
fn test_motion_params_survive_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timing.caf");
    let caf = build_caf();
    caf.save(&path, ControllerEncoding::Parallel).unwrap();

    let reloaded = CafFile::load(&path).unwrap();
    let params = reloaded.params.unwrap();
    assert!((params.sample_rate() - 30.0).abs() < 1e-4);
    assert!((params.duration_sec() - 40.0 / 30.0).abs() < 1e-4);
    assert!((params.move_speed - 2.25).abs() < f32::EPSILON);
}
