use core::cell::RefCell;

use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use erratic_core::utils::{
    config::ArrayConfig,
    controllers::{ArrayController, DeviceError, Direction, MotorDriver, MotorShields},
    erratic::{array::SetupError, scheduler::ArmDraw},
    Timestamp,
};
use rand::{rngs::SmallRng, SeedableRng};

/// Shield address used throughout (all jumpers open).
pub const SHIELD_ADDRESS: u8 = 0x60;

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}

/// Bring-up: enable the oscillator, sleep / prescale 3 / wake, then turn on
/// register auto-increment and pull every channel low via ALL_LED.
fn begin(addr: u8) -> Vec<I2cTrans> {
    vec![
        write(addr, vec![0x00, 0x01]),
        write(addr, vec![0x00, 0x11]),
        write(addr, vec![0xFE, 3]),
        write(addr, vec![0x00, 0x01]),
        write(addr, vec![0x00, 0x21]),
        write(addr, vec![0xFA, 0x00, 0x00, 0x00, 0x00]),
    ]
}

/// `(pwm, in2, in1)` PCA9685 channels for M1..M4.
const CHANNELS: [(u8, u8, u8); 4] = [(8, 9, 10), (13, 12, 11), (2, 3, 4), (7, 6, 5)];

fn led_register(channel: u8) -> u8 {
    0x06 + 4 * channel
}

fn pin_low(channel: u8) -> I2cTrans {
    write(SHIELD_ADDRESS, vec![led_register(channel), 0x00, 0x00, 0x00, 0x00])
}

fn pin_high(channel: u8) -> I2cTrans {
    write(SHIELD_ADDRESS, vec![led_register(channel), 0x00, 0x10, 0x00, 0x00])
}

fn duty(
    channel: u8,
    speed: u8,
) -> I2cTrans {
    let off = u16::from(speed) * 16;
    write(
        SHIELD_ADDRESS,
        vec![led_register(channel), 0x00, 0x00, off as u8, (off >> 8) as u8],
    )
}

/// Pin writes the shield issues for `direction` on `position`.
fn bridge(
    position: u8,
    direction: Direction,
) -> Vec<I2cTrans> {
    let (_, in2, in1) = CHANNELS[usize::from(position) - 1];
    match direction {
        Direction::Forward => vec![pin_low(in2), pin_high(in1)],
        Direction::Backward => vec![pin_low(in1), pin_high(in2)],
        Direction::Release => vec![pin_low(in1), pin_low(in2)],
        Direction::Brake => vec![pin_high(in1), pin_high(in2)],
    }
}

fn drive_test(
    position: u8,
    direction: Direction,
) {
    let mut expectations = begin(SHIELD_ADDRESS);
    expectations.extend(bridge(position, direction));
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    let motor = shields.motor_handle(SHIELD_ADDRESS, position).unwrap();
    shields.set_direction(motor, direction).unwrap();
    i2c_bus.borrow_mut().done();
}

fn single_board() -> ArrayConfig {
    ArrayConfig::with_boards(&[SHIELD_ADDRESS]).unwrap()
}

#[test]
fn test_new_is_silent() {
    let mock = I2cMock::new(&[]);
    let i2c_bus = RefCell::new(mock);
    let _shields = MotorShields::new(&i2c_bus, &ArrayConfig::default()).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_handle_brings_board_up_once() {
    let mock = I2cMock::new(&begin(SHIELD_ADDRESS));
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    let m1 = shields.motor_handle(SHIELD_ADDRESS, 1).unwrap();
    let m4 = shields.motor_handle(SHIELD_ADDRESS, 4).unwrap();
    assert_eq!((m1.board(), m1.position()), (SHIELD_ADDRESS, 1));
    assert_eq!(m4.position(), 4);
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_unreachable_board() {
    let expectations = [write(SHIELD_ADDRESS, vec![0x00, 0x01]).with_error(ErrorKind::Other)];
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    assert!(matches!(
        shields.motor_handle(SHIELD_ADDRESS, 1),
        Err(DeviceError::PwmError(_))
    ));
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_address_validation_needs_no_bus() {
    let mock = I2cMock::new(&[]);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    assert!(matches!(
        shields.motor_handle(SHIELD_ADDRESS, 0),
        Err(DeviceError::InvalidPosition(0))
    ));
    assert!(matches!(
        shields.motor_handle(SHIELD_ADDRESS, 5),
        Err(DeviceError::InvalidPosition(5))
    ));
    assert!(matches!(
        shields.motor_handle(0x70, 1),
        Err(DeviceError::UnknownBoard(0x70))
    ));
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_speed_scales_to_twelve_bits() {
    // M1 PWM is channel 8 (register 0x26); 200 * 16 = 0x0C80
    let mut expectations = begin(SHIELD_ADDRESS);
    expectations.extend([
        write(SHIELD_ADDRESS, vec![0x26, 0x00, 0x00, 0x80, 0x0C]),
        write(SHIELD_ADDRESS, vec![0x26, 0x00, 0x00, 0xF0, 0x0F]),
        write(SHIELD_ADDRESS, vec![0x26, 0x00, 0x00, 0x00, 0x00]),
    ]);
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    let m1 = shields.motor_handle(SHIELD_ADDRESS, 1).unwrap();
    shields.set_speed(m1, 200).unwrap();
    shields.set_speed(m1, 255).unwrap();
    shields.set_speed(m1, 0).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_release_pulls_both_inputs_low() {
    // M3 inputs: IN1 = channel 4 (0x16), IN2 = channel 3 (0x12)
    let mut expectations = begin(SHIELD_ADDRESS);
    expectations.extend([
        write(SHIELD_ADDRESS, vec![0x16, 0x00, 0x00, 0x00, 0x00]),
        write(SHIELD_ADDRESS, vec![0x12, 0x00, 0x00, 0x00, 0x00]),
    ]);
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    let m3 = shields.motor_handle(SHIELD_ADDRESS, 3).unwrap();
    shields.set_direction(m3, Direction::Release).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_forward_drives_in1_high() {
    // M3: IN2 = channel 3 low, then IN1 = channel 4 full-on
    drive_test(3, Direction::Forward);
}

#[test]
fn test_backward_drives_in2_high() {
    // M2: IN1 = channel 11 low, then IN2 = channel 12 full-on
    drive_test(2, Direction::Backward);
}

#[test]
fn test_brake_drives_both_inputs_high() {
    // M4: IN1 = channel 5, IN2 = channel 6, both full-on
    drive_test(4, Direction::Brake);
}

#[test]
fn test_full_on_bytes() {
    let mut expectations = begin(SHIELD_ADDRESS);
    expectations.extend([
        write(SHIELD_ADDRESS, vec![0x2A, 0x00, 0x00, 0x00, 0x00]),
        write(SHIELD_ADDRESS, vec![0x2E, 0x00, 0x10, 0x00, 0x00]),
    ]);
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut shields = MotorShields::new(&i2c_bus, &single_board()).unwrap();
    let m1 = shields.motor_handle(SHIELD_ADDRESS, 1).unwrap();
    shields.set_direction(m1, Direction::Forward).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_arm_then_halt_on_the_bus() {
    let seed = 31;
    let mut shadow = SmallRng::seed_from_u64(seed);
    let mut expectations = begin(SHIELD_ADDRESS);
    for position in 1..=4u8 {
        let draw = ArmDraw::draw(&mut shadow);
        let (pwm, _, _) = CHANNELS[usize::from(position) - 1];
        expectations.extend(bridge(position, draw.direction));
        expectations.push(duty(pwm, draw.speed));
        expectations.extend(bridge(position, Direction::Release));
    }
    for position in 1..=4u8 {
        let (pwm, _, _) = CHANNELS[usize::from(position) - 1];
        expectations.push(duty(pwm, 0));
        expectations.extend(bridge(position, Direction::Brake));
    }

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let cfg = single_board();
    let shields = MotorShields::new(&i2c_bus, &cfg).unwrap();
    let mut ctrl: ArrayController<_, SmallRng, 4> =
        ArrayController::new(shields, SmallRng::seed_from_u64(seed));
    ctrl.init(&cfg, Timestamp::from_micros(0)).unwrap();
    ctrl.halt_all().unwrap();
    assert!(ctrl.array().iter().all(|m| m.is_halted()));
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_array_init_fails_on_missing_board() {
    let cfg = ArrayConfig::with_boards(&[SHIELD_ADDRESS]).unwrap();
    let expectations = [write(SHIELD_ADDRESS, vec![0x00, 0x01]).with_error(ErrorKind::Other)];
    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let shields = MotorShields::new(&i2c_bus, &cfg).unwrap();
    let mut ctrl: ArrayController<_, SmallRng, 4> =
        ArrayController::new(shields, SmallRng::seed_from_u64(0));

    let err = ctrl.init(&cfg, Timestamp::from_micros(0)).unwrap_err();
    assert!(matches!(
        err,
        SetupError::Unreachable {
            slot: 0,
            board: SHIELD_ADDRESS,
            position: 1,
            ..
        }
    ));
    assert!(ctrl.array().iter().all(|m| !m.is_bound()));
    i2c_bus.borrow_mut().done();
}
