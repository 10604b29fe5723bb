use super::*;

const EPS: f64 = 1e-9;

fn pose(x: f64, y: f64, z: f64) -> CameraPose {
    CameraPose {
        x,
        y,
        z,
        yaw: 0.0,
        pitch: 0.0,
        field_of_view: 1.0,
        time: 0,
        lens: Lens::Pinhole,
    }
}

fn assert_bits_eq(a: &CameraPose, b: &CameraPose) {
    assert_eq!(a.x.to_bits(), b.x.to_bits());
    assert_eq!(a.y.to_bits(), b.y.to_bits());
    assert_eq!(a.z.to_bits(), b.z.to_bits());
    assert_eq!(a.yaw.to_bits(), b.yaw.to_bits());
    assert_eq!(a.pitch.to_bits(), b.pitch.to_bits());
    assert_eq!(a.field_of_view.to_bits(), b.field_of_view.to_bits());
    assert_eq!(a.time, b.time);
    assert_eq!(a.lens, b.lens);
}

#[test]
fn quanta_match_reference_calibration() {
    let q = PathQuanta::new(1.0, 25).unwrap();
    assert_eq!(q.move_per_frame, 4.0);
    assert!((q.angle_per_frame - PI / 100.0).abs() < EPS);
    assert_eq!(q.time_per_frame, 345_600.0);
}

#[test]
fn single_keyframe_yields_single_pose() {
    let mut k = pose(12.5, -3.0, 170.0);
    k.lens = Lens::Spherical;
    k.time = 42;
    let path = compute_path(&[k], 1.0, 25).unwrap();
    assert_eq!(path.len(), 1);
    assert_bits_eq(&path[0], &k);
    assert_eq!(path.fps(), 25);
}

#[test]
fn distance_governs_frame_count() {
    let a = pose(0.0, 0.0, 170.0);
    let b = pose(100.0, 0.0, 170.0);
    let path = compute_path(&[a, b], 1.0, 25).unwrap();

    // 100 units at 4 units per frame.
    assert_eq!(path.len(), 1 + 25);
    for (k, p) in path.iter().enumerate() {
        assert!((p.x - 4.0 * k as f64).abs() < EPS, "pose {k}: {}", p.x);
    }
    assert_bits_eq(path.poses().last().unwrap(), &b);
}

#[test]
fn near_duplicate_keyframes_still_emit_target() {
    let a = pose(0.0, 0.0, 170.0);
    let b = pose(0.5, 0.0, 170.0);
    let path = compute_path(&[a, b], 1000.0, 25).unwrap();
    assert_eq!(path.len(), 2);
    assert_bits_eq(&path[1], &b);

    // Identical keyframes behave the same way.
    let path = compute_path(&[a, a], 1.0, 25).unwrap();
    assert_eq!(path.len(), 2);
    assert_bits_eq(&path[1], &a);
}

#[test]
fn integral_counts_keep_every_step_within_one_quantum() {
    let q = PathQuanta::new(1.0, 25).unwrap();
    let a = pose(0.0, 0.0, 170.0);
    let b = CameraPose {
        x: 24.0,
        y: 32.0, // distance 40 => 10 frames
        z: 170.0,
        yaw: 5.0 * q.angle_per_frame,
        pitch: -3.0 * q.angle_per_frame,
        field_of_view: 1.0 + 2.0 * q.angle_per_frame,
        time: (7.0 * q.time_per_frame) as i64,
        lens: Lens::Normal,
    };
    let path = compute_path(&[a, b], 1.0, 25).unwrap();
    assert_eq!(path.len(), 11);

    for w in path.poses().windows(2) {
        let (p, n) = (&w[0], &w[1]);
        assert!(p.distance_to(n) <= q.move_per_frame + EPS);
        assert!((n.yaw - p.yaw).abs() <= q.angle_per_frame + EPS);
        assert!((n.pitch - p.pitch).abs() <= q.angle_per_frame + EPS);
        assert!((n.field_of_view - p.field_of_view).abs() <= q.angle_per_frame + EPS);
        assert!(((n.time - p.time) as f64).abs() <= q.time_per_frame + 1.0);
    }
}

#[test]
fn fractional_counts_stay_within_floor_rounding_bound() {
    let speed = 1.3;
    let fps = 30;
    let q = PathQuanta::new(speed, fps).unwrap();
    let keys = [
        pose(0.0, 0.0, 170.0),
        CameraPose {
            yaw: 0.7,
            time: 3_000_000,
            ..pose(137.0, 51.0, 170.0)
        },
        CameraPose {
            pitch: -0.4,
            field_of_view: 0.6,
            time: 3_100_000,
            ..pose(141.0, 52.0, 90.0)
        },
        CameraPose {
            yaw: 2.9,
            time: 90_000_000,
            ..pose(141.0, 52.0, 90.0)
        },
    ];
    let path = compute_path(&keys, speed, fps).unwrap();

    let mut offset = 0;
    for pair in keys.windows(2) {
        let n = q.segment_frame_count(&pair[0], &pair[1]);
        let slack = 1.0 + 1.0 / n as f64;
        let segment = &path.poses()[offset..=offset + n as usize];
        for w in segment.windows(2) {
            let (p, c) = (&w[0], &w[1]);
            assert!(p.distance_to(c) <= q.move_per_frame * slack + EPS);
            assert!((c.yaw - p.yaw).abs() <= q.angle_per_frame * slack + EPS);
            assert!((c.pitch - p.pitch).abs() <= q.angle_per_frame * slack + EPS);
            assert!((c.field_of_view - p.field_of_view).abs() <= q.angle_per_frame * slack + EPS);
            assert!(((c.time - p.time) as f64).abs() <= q.time_per_frame * slack + 1.0);
        }
        assert_eq!(segment.last().unwrap().x, pair[1].x);
        offset += n as usize;
    }
    assert_eq!(offset + 1, path.len());
}

#[test]
fn segments_land_exactly_on_target_keyframe() {
    let a = pose(0.1, 0.2, 0.3);
    let b = CameraPose {
        yaw: 0.3,
        pitch: 0.1,
        field_of_view: 0.7,
        time: 1_000_001,
        ..pose(0.3, 10.7, 9.9)
    };
    let path = compute_path(&[a, b], 0.7, 24).unwrap();
    let last = path.poses().last().unwrap();
    assert_bits_eq(last, &b);
}

#[test]
fn interpolated_poses_use_pinhole_lens() {
    let mut a = pose(0.0, 0.0, 170.0);
    a.lens = Lens::Fisheye;
    let mut b = pose(50.0, 0.0, 170.0);
    b.lens = Lens::Spherical;
    let mut c = pose(50.0, 80.0, 170.0);
    c.lens = Lens::Normal;

    let path = compute_path(&[a, b, c], 1.0, 25).unwrap();
    assert_eq!(path[0].lens, Lens::Fisheye);
    assert!(path.iter().skip(1).all(|p| p.lens == Lens::Pinhole));
}

#[test]
fn timestamps_are_rounded_per_step() {
    let a = pose(0.0, 0.0, 0.0);
    let b = CameraPose {
        time: 10,
        ..pose(12.0, 0.0, 0.0)
    };
    let path = compute_path(&[a, b], 1.0, 25).unwrap();
    let times: Vec<i64> = path.iter().map(|p| p.time).collect();
    assert_eq!(times, vec![0, 3, 7, 10]);
}

#[test]
fn computation_is_deterministic() {
    let keys = [
        pose(0.0, 0.0, 170.0),
        CameraPose {
            yaw: 1.1,
            pitch: 0.2,
            time: 5_000_000,
            ..pose(333.3, -21.7, 150.0)
        },
        CameraPose {
            field_of_view: 1.4,
            ..pose(12.0, 400.0, 150.0)
        },
    ];
    let first = compute_path(&keys, 0.8, 25).unwrap();
    let second = compute_path(&keys, 0.8, 25).unwrap();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_bits_eq(a, b);
    }
}

#[test]
fn invalid_parameters_are_rejected() {
    let k = pose(0.0, 0.0, 0.0);
    assert!(matches!(
        compute_path(&[], 1.0, 25),
        Err(FlythroughError::Validation(_))
    ));
    assert!(compute_path(&[k], 0.0, 25).is_err());
    assert!(compute_path(&[k], -1.0, 25).is_err());
    assert!(compute_path(&[k], f64::NAN, 25).is_err());
    assert!(compute_path(&[k], 1.0, 0).is_err());
    assert!(compute_path(&[k, pose(f64::NAN, 0.0, 0.0)], 1.0, 25).is_err());
}

#[test]
fn oversized_paths_are_rejected_before_allocation() {
    let a = pose(0.0, 0.0, 0.0);
    let b = pose(1.0e12, 0.0, 0.0);
    let err = compute_path(&[a, b], 1.0, 25).unwrap_err();
    assert!(err.to_string().contains("limit"));
}

#[test]
fn duration_follows_fps() {
    let path = compute_path(&[pose(0.0, 0.0, 0.0), pose(100.0, 0.0, 0.0)], 1.0, 26).unwrap();
    assert_eq!(path.duration_secs(), path.len() as f64 / 26.0);
}
