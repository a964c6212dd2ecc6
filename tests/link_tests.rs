// Line-protocol controller against a scripted stream

use blockbot::controller::{
    Controller, ControllerError, InputDevice, LinkController, MotorPort, OutputDevice,
    ABSENT_READING,
};
use std::io::{self, Cursor, Read, Write};

/// Replays canned answers and records every request
struct ScriptedStream {
    answers: Cursor<Vec<u8>>,
    requests: Vec<u8>,
}

impl ScriptedStream {
    fn new(answers: &str) -> Self {
        ScriptedStream {
            answers: Cursor::new(answers.as_bytes().to_vec()),
            requests: Vec::new(),
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.answers.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.requests.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_inventory_and_readings() {
    let stream = ScriptedStream::new("IN touch ultrasonic;OUT B C\n1\n42\n-\nOK\n");
    let mut link = LinkController::connect(stream).unwrap();

    assert_eq!(
        link.input_devices().into_iter().collect::<Vec<_>>(),
        vec![InputDevice::TouchSensor, InputDevice::UltrasonicSensor]
    );
    assert!(link.output_devices().contains(&OutputDevice::Motor(MotorPort::C)));

    assert!(link.touch_pressed().unwrap());
    assert_eq!(link.distance_cm().unwrap(), 42);
    assert_eq!(link.light_percent().unwrap(), ABSENT_READING);
    link.set_motor_power(MotorPort::B, -30).unwrap();
    // Port A is not connected, so nothing is sent
    link.set_motor_power(MotorPort::A, 50).unwrap();

    let sent = String::from_utf8(link.into_inner().requests).unwrap();
    assert_eq!(sent, "DEVICES?\nTOUCH?\nDISTANCE?\nLIGHT?\nMOTOR B -30\n");
}

#[test]
fn test_error_answer_is_protocol_error() {
    let stream = ScriptedStream::new("IN;OUT B\nERR motor stalled\n");
    let mut link = LinkController::connect(stream).unwrap();

    let err = link.set_motor_power(MotorPort::B, 10).unwrap_err();
    assert!(matches!(err, ControllerError::Protocol(ref m) if m == "motor stalled"));
}

#[test]
fn test_closed_stream_is_disconnect() {
    let stream = ScriptedStream::new("IN light;OUT\n");
    let mut link = LinkController::connect(stream).unwrap();
    assert!(matches!(link.light_percent(), Err(ControllerError::Disconnected)));
}

#[test]
fn test_bad_inventory_is_rejected() {
    let stream = ScriptedStream::new("IN sonar;OUT B\n");
    assert!(matches!(
        LinkController::connect(stream),
        Err(ControllerError::Protocol(_))
    ));
}
