//! Integration tests for the kvm-serial-core frame contract.
//!
//! These tests drive the public API the way the link crate does: translate a
//! captured key or pointer position, encode it, and check the exact bytes that
//! would go on the wire.

use kvm_serial_core::{
    encode_key, encode_mouse, Frame, Hotkey, KeyAction, KeyMapper, MouseAction, Opcode, Point,
    ProfileKind, ScrollDirection, Viewport, WireProfile, FRAME_LEN,
};

fn hex(frames: &[Frame]) -> Vec<String> {
    frames.iter().map(|f| f.to_string()).collect()
}

#[test]
fn test_captured_letter_becomes_keyboard_frames() {
    // Arrange – VK_A pressed then released
    let code = KeyMapper::vk_to_device(0x41);

    // Act
    let frames = [encode_key(KeyAction::Down, code), encode_key(KeyAction::Up, code)];

    // Assert
    assert_eq!(
        hex(&frames),
        vec!["33 01 01 61 00 00".to_string(), "33 01 00 61 00 00".to_string()]
    );
}

#[test]
fn test_captured_delete_uses_device_code() {
    let code = KeyMapper::vk_to_device(0x2E);
    assert_eq!(
        encode_key(KeyAction::Down, code).as_bytes(),
        &[0x33, 0x01, 0x01, 0xD4, 0x00, 0x00]
    );
}

#[test]
fn test_view_click_encodes_absolute_device_position() {
    // Arrange – click in the centre of an 800×600 view
    let view = Viewport::new(800.0, 600.0);
    let pos = view.to_device(400.0, 300.0);

    // Act
    let down = encode_mouse(MouseAction::LeftDown, pos, &WireProfile::STANDARD).unwrap();

    // Assert – 0x3FFF on both axes, little-endian
    assert_eq!(down.as_bytes(), &[0x22, 0xFF, 0x3F, 0xFF, 0x3F, 0x00]);
}

#[test]
fn test_every_frame_is_six_bytes_and_has_known_opcode() {
    let mut frames = Hotkey::CtrlAltDel.frames();
    frames.push(encode_mouse(MouseAction::Move, Point::new(1, 2), &WireProfile::STANDARD).unwrap());
    frames.push(
        encode_mouse(
            MouseAction::Scroll(ScrollDirection::Down),
            Point::new(1, 2),
            &WireProfile::STANDARD,
        )
        .unwrap(),
    );

    for frame in &frames {
        assert_eq!(frame.as_bytes().len(), FRAME_LEN);
        assert!(frame.opcode().is_some(), "unexpected opcode in {frame}");
    }
    assert_eq!(frames.last().unwrap().opcode(), Some(Opcode::MouseScroll));
}

#[test]
fn test_only_move_frames_are_motion() {
    let profile = ProfileKind::Standard.profile();
    let motion = encode_mouse(MouseAction::Move, Point::new(0, 0), &profile).unwrap();
    let left = encode_mouse(MouseAction::LeftUp, Point::new(0, 0), &profile).unwrap();
    let key = encode_key(KeyAction::Down, b'x');

    assert!(motion.is_motion());
    assert!(!left.is_motion());
    assert!(!key.is_motion());
}

#[test]
fn test_profiles_differ_only_in_right_button_and_scaling() {
    let pos = Point::new(10, 10);
    let std_left = encode_mouse(MouseAction::LeftDown, pos, &WireProfile::STANDARD).unwrap();
    let cal_left = encode_mouse(MouseAction::LeftDown, pos, &WireProfile::CALIBRATED).unwrap();
    let std_right = encode_mouse(MouseAction::RightDown, pos, &WireProfile::STANDARD).unwrap();
    let cal_right = encode_mouse(MouseAction::RightDown, pos, &WireProfile::CALIBRATED).unwrap();

    assert_eq!(std_left.opcode_byte(), cal_left.opcode_byte());
    assert_eq!(std_left.as_bytes()[5], cal_left.as_bytes()[5]);
    assert_eq!(std_right.opcode_byte(), 0x22);
    assert_eq!(cal_right.opcode_byte(), 0x33);
}
