//! End-to-end tests for the aim-pose pipeline: capture relative poses
//! through a skeleton, persist the grid, reload it, and sample.

use cry_anim::aim::{cell_polar, AimFile, AimPoseGrid, XGRID, YGRID};
use cry_anim::error::AnimError;
use cry_anim::skeleton::{Joint, Skeleton};
use cry_data::QuatT;
use glam::{Quat, Vec3};

fn spine_skeleton() -> Skeleton {
    Skeleton::new(vec![
        Joint {
            parent: None,
            default_rel: QuatT::new(Quat::IDENTITY, Vec3::ZERO),
        },
        Joint {
            parent: Some(0),
            default_rel: QuatT::new(Quat::IDENTITY, Vec3::new(0.0, 0.0, 0.5)),
        },
        Joint {
            parent: Some(1),
            default_rel: QuatT::new(Quat::IDENTITY, Vec3::new(0.0, 0.0, 0.4)),
        },
    ])
    .unwrap()
}

/// Aim pose for one direction: the root yaws, the upper joints pitch.
fn relative_pose(skeleton: &Skeleton, yaw: f32, pitch: f32) -> Vec<QuatT> {
    let mut rel: Vec<QuatT> = skeleton.joints().iter().map(|j| j.default_rel).collect();
    rel[0].q = Quat::from_rotation_z(yaw);
    rel[1].q = Quat::from_rotation_x(pitch * 0.5);
    rel[2].q = Quat::from_rotation_x(pitch * 0.5);
    rel
}

fn captured_grid(skeleton: &Skeleton) -> AimPoseGrid {
    let mut grid = AimPoseGrid::new(skeleton.joint_count());
    // a 3x3 block of captures around the grid center
    for y in 3..=5 {
        for x in 7..=9 {
            let polar = cell_polar(x, y);
            let rel = relative_pose(skeleton, polar.x, polar.y);
            grid.set_example(x, y, skeleton, &rel).unwrap();
        }
    }
    grid
}

#[test]
fn test_capture_stores_absolute_poses() {
    let skeleton = spine_skeleton();
    let grid = captured_grid(&skeleton);

    // the centre capture is the unrotated chain: joint 2 sits at z = 0.9
    let center = grid.cell(8, 4).unwrap();
    assert!((center.poses[2].t - Vec3::new(0.0, 0.0, 0.9)).length() < 1e-5);
}

#[test]
fn test_sampling_between_captures_is_smooth() {
    let skeleton = spine_skeleton();
    let grid = captured_grid(&skeleton);

    let a = cell_polar(8, 4);
    let b = cell_polar(9, 4);
    let steps = 8;
    let mut last_yaw = f32::NEG_INFINITY;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let yaw = a.x + (b.x - a.x) * t;
        let pose = grid.sample(yaw, 0.0).unwrap();

        for joint in &pose {
            assert!((joint.q.length() - 1.0).abs() < 1e-5);
            assert!(joint.t.is_finite());
        }

        // root yaw must increase monotonically across the cell
        let (axis, angle) = pose[0].q.to_axis_angle();
        let yaw_angle = angle * axis.z.signum();
        assert!(yaw_angle >= last_yaw - 1e-4, "yaw regressed at step {i}");
        last_yaw = yaw_angle;
    }
}

#[test]
fn test_file_roundtrip_preserves_sampling() {
    let skeleton = spine_skeleton();
    let grid = captured_grid(&skeleton);
    let aim = AimFile { params: None, grid };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aim_up.aim");
    aim.save(&path).unwrap();

    let reloaded = AimFile::load(&path).unwrap();
    assert_eq!(reloaded.grid.example_count(), 9);

    for (yaw, pitch) in [(0.0f32, 0.0f32), (0.17, -0.12), (0.3, 0.3)] {
        let a = aim.grid.sample(yaw, pitch).unwrap();
        let b = reloaded.grid.sample(yaw, pitch).unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.q.to_array(), pb.q.to_array());
            assert_eq!(pa.t.to_array(), pb.t.to_array());
        }
    }
}

#[test]
fn test_sparse_grid_still_covers_every_direction() {
    let skeleton = spine_skeleton();
    let grid = captured_grid(&skeleton);

    // queries far outside the captured block substitute the nearest
    // captures and must stay finite and unit-length
    for y in 0..YGRID {
        for x in 0..XGRID {
            let polar = cell_polar(x, y);
            let pose = grid.sample(polar.x, polar.y).unwrap();
            for joint in &pose {
                assert!((joint.q.length() - 1.0).abs() < 1e-5);
                assert!(joint.t.is_finite());
            }
        }
    }
}

#[test]
fn test_empty_grid_falls_back_to_bind_pose() {
    let skeleton = spine_skeleton();
    let grid = AimPoseGrid::new(skeleton.joint_count());

    let pose = match grid.sample(0.1, 0.1) {
        Ok(pose) => pose,
        Err(AnimError::MissingExampleData) => skeleton.bind_pose_absolute(),
        Err(other) => panic!("unexpected error: {other}"),
    };
    assert!((pose[2].t - Vec3::new(0.0, 0.0, 0.9)).length() < 1e-5);
}
