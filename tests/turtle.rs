use glam::Vec3;
use std::f32::consts::FRAC_PI_2;
use symbios_arbor::{Error, Turtle, TurtleState};

#[test]
fn test_default_frame() {
    let state = TurtleState::default();

    assert_eq!(state.position, Vec3::ZERO);
    assert!(state.heading().abs_diff_eq(Vec3::Z, 1e-6));
    assert!(state.left().abs_diff_eq(Vec3::NEG_Y, 1e-6));
    assert!(state.up().abs_diff_eq(Vec3::X, 1e-6));
}

#[test]
fn test_move_follows_local_heading() {
    let mut turtle = Turtle::default();

    turtle.move_forward(2.0);
    assert!(turtle.position().abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-6));

    // Yaw about up (+X) by 90 degrees: heading swings onto left (-Y).
    turtle.yaw(FRAC_PI_2);
    turtle.move_forward(1.0);
    assert!(turtle.position().abs_diff_eq(Vec3::new(0.0, -1.0, 2.0), 1e-6));
}

#[test]
fn test_pitch_turns_about_left_axis() {
    let mut turtle = Turtle::default();

    turtle.pitch(FRAC_PI_2);
    // Left is unchanged by a pitch.
    assert!(turtle.state().left().abs_diff_eq(Vec3::NEG_Y, 1e-6));
    turtle.move_forward(1.0);
    assert!(turtle.position().abs_diff_eq(Vec3::NEG_X, 1e-6));
}

#[test]
fn test_turns_compose_in_local_frame() {
    let mut turtle = Turtle::default();

    // Roll about the heading moves left onto +X; the following yaw must use
    // the rolled frame, so heading ends up on +X rather than -Y.
    turtle.roll(FRAC_PI_2);
    assert!(turtle.state().heading().abs_diff_eq(Vec3::Z, 1e-6));
    turtle.yaw(FRAC_PI_2);
    turtle.move_forward(1.0);
    assert!(turtle.position().abs_diff_eq(Vec3::X, 1e-6));
}

#[test]
fn test_push_pop_restores_pose() {
    let mut turtle = Turtle::default();
    turtle.move_forward(1.5);
    turtle.yaw(0.3);
    let before = *turtle.state();

    turtle.push().unwrap();
    turtle.pitch(0.7);
    turtle.move_forward(3.0);
    turtle.roll(-1.1);
    turtle.push().unwrap();
    turtle.yaw(2.0);
    turtle.pop().unwrap();
    turtle.move_forward(0.25);
    turtle.pop().unwrap();

    assert_eq!(turtle.depth(), 0);
    assert!(turtle.position().abs_diff_eq(before.position, 1e-6));
    assert!(turtle.rotation().abs_diff_eq(before.rotation, 1e-6));
}

#[test]
fn test_pop_on_empty_stack_fails() {
    let mut turtle = Turtle::default();
    turtle.move_forward(1.0);

    assert_eq!(turtle.pop(), Err(Error::StackUnderflow { index: None }));
    // The failed pop leaves the pose untouched.
    assert!(turtle.position().abs_diff_eq(Vec3::Z, 1e-6));
}

#[test]
fn test_push_beyond_max_depth_fails() {
    let mut turtle = Turtle::new(2);

    turtle.push().unwrap();
    turtle.push().unwrap();
    assert_eq!(
        turtle.push(),
        Err(Error::StackOverflow {
            depth: 2,
            index: None
        })
    );
}
