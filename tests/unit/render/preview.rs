use super::*;
use crate::foundation::core::Lens;

fn eye_level() -> CameraPose {
    CameraPose {
        x: 0.0,
        y: 0.0,
        z: 170.0,
        yaw: 0.0,
        pitch: 0.0,
        field_of_view: 1.0,
        time: 0,
        lens: Lens::Pinhole,
    }
}

#[test]
fn renders_requested_dimensions() {
    let mut r = PreviewRenderer::new(Environment::default());
    let img = r.render(&eye_level(), 64, 48).unwrap();
    assert_eq!(img.dimensions(), (64, 48));
    assert_eq!(r.frames_rendered(), 1);
}

#[test]
fn sky_above_ground_below_at_eye_level() {
    let mut r = PreviewRenderer::new(Environment::default());
    let img = r.render(&eye_level(), 64, 48).unwrap();

    let top = img.get_pixel(32, 0).0;
    let bottom = img.get_pixel(32, 47).0;
    assert!(top[2] > top[0], "sky should be blue-ish: {top:?}");
    assert!(bottom[0] > bottom[2], "ground should be warm: {bottom:?}");
}

#[test]
fn output_is_deterministic_and_pose_dependent() {
    let mut r = PreviewRenderer::new(Environment::default());
    let down = CameraPose {
        x: 30.0,
        y: 70.0,
        pitch: 1.2,
        ..eye_level()
    };
    let a = r.render(&down, 40, 30).unwrap();
    let b = r.render(&down, 40, 30).unwrap();
    assert_eq!(a.as_raw(), b.as_raw());

    let turned = CameraPose { yaw: 0.4, ..down };
    let c = r.render(&turned, 40, 30).unwrap();
    assert_ne!(a.as_raw(), c.as_raw());
}

#[test]
fn raised_interrupt_fails_with_interrupted() {
    let flag = InterruptFlag::new();
    let mut r = PreviewRenderer::new(Environment::default()).with_interrupt(flag.clone());
    assert!(r.render(&eye_level(), 8, 8).is_ok());
    flag.raise();
    assert!(matches!(
        r.render(&eye_level(), 8, 8),
        Err(RenderError::Interrupted)
    ));
}

#[test]
fn invalid_field_of_view_is_a_render_failure() {
    let mut r = PreviewRenderer::new(Environment::default());
    let pose = CameraPose {
        field_of_view: 0.0,
        ..eye_level()
    };
    assert!(matches!(
        r.render(&pose, 8, 8),
        Err(RenderError::Failed(_))
    ));
}
