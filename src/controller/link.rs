//! Line-protocol controller
//!
//! Talks to a robot bridge over any byte stream. Every request is one line,
//! every answer is one line:
//!
//! ```text
//! DEVICES?          -> IN touch ultrasonic;OUT B C
//! TOUCH?            -> 1 | 0 | -
//! DISTANCE?         -> <cm> | -
//! LIGHT?            -> <percent> | -
//! MOTOR <port> <p>  -> OK
//! ```
//!
//! `-` means the device is not connected and maps to the sentinel value.
//! `ERR <message>` maps to [`ControllerError::Protocol`].

use super::{Controller, ControllerError, InputDevice, MotorPort, OutputDevice, ABSENT_READING};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

pub struct LinkController<S: Read + Write> {
    stream: BufReader<S>,
    inputs: BTreeSet<InputDevice>,
    outputs: BTreeSet<OutputDevice>,
}

impl LinkController<TcpStream> {
    /// Connect to a bridge listening on `addr`
    pub fn tcp(addr: impl ToSocketAddrs) -> Result<Self, ControllerError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Self::connect(stream)
    }
}

impl<S: Read + Write> LinkController<S> {
    /// Wrap an open stream and query the device inventory
    pub fn connect(stream: S) -> Result<Self, ControllerError> {
        let mut controller = LinkController {
            stream: BufReader::new(stream),
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
        };
        let answer = controller.request("DEVICES?")?;
        let (inputs, outputs) = parse_inventory(&answer)?;
        tracing::info!(?inputs, ?outputs, "robot link established");
        controller.inputs = inputs;
        controller.outputs = outputs;
        Ok(controller)
    }

    /// Give the stream back, e.g. to close it explicitly
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn request(&mut self, line: &str) -> Result<String, ControllerError> {
        tracing::trace!(request = line, "robot link");
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        let mut answer = String::new();
        if self.stream.read_line(&mut answer)? == 0 {
            return Err(ControllerError::Disconnected);
        }
        let answer = answer.trim().to_string();
        if let Some(message) = answer.strip_prefix("ERR") {
            return Err(ControllerError::Protocol(message.trim().to_string()));
        }
        Ok(answer)
    }

    fn read_number(&mut self, query: &str) -> Result<i32, ControllerError> {
        let answer = self.request(query)?;
        if answer == "-" {
            return Ok(ABSENT_READING);
        }
        answer
            .parse()
            .map_err(|_| ControllerError::Protocol(format!("{} answered '{}'", query, answer)))
    }
}

fn parse_inventory(
    answer: &str,
) -> Result<(BTreeSet<InputDevice>, BTreeSet<OutputDevice>), ControllerError> {
    let mut inputs = BTreeSet::new();
    let mut outputs = BTreeSet::new();

    for section in answer.split(';') {
        let mut words = section.split_whitespace();
        match words.next() {
            Some("IN") => {
                for word in words {
                    let device = InputDevice::from_name(word).ok_or_else(|| {
                        ControllerError::Protocol(format!("unknown sensor '{}'", word))
                    })?;
                    inputs.insert(device);
                }
            }
            Some("OUT") => {
                for word in words {
                    let port = word
                        .chars()
                        .next()
                        .filter(|_| word.len() == 1)
                        .and_then(MotorPort::from_letter)
                        .ok_or_else(|| {
                            ControllerError::Protocol(format!("unknown motor port '{}'", word))
                        })?;
                    outputs.insert(OutputDevice::Motor(port));
                }
            }
            None => {}
            Some(other) => {
                return Err(ControllerError::Protocol(format!(
                    "unexpected inventory section '{}'",
                    other
                )))
            }
        }
    }

    Ok((inputs, outputs))
}

impl<S: Read + Write> Controller for LinkController<S> {
    fn input_devices(&self) -> BTreeSet<InputDevice> {
        self.inputs.clone()
    }

    fn output_devices(&self) -> BTreeSet<OutputDevice> {
        self.outputs.clone()
    }

    fn touch_pressed(&mut self) -> Result<bool, ControllerError> {
        match self.request("TOUCH?")?.as_str() {
            "1" => Ok(true),
            "0" | "-" => Ok(false),
            other => Err(ControllerError::Protocol(format!(
                "TOUCH? answered '{}'",
                other
            ))),
        }
    }

    fn distance_cm(&mut self) -> Result<i32, ControllerError> {
        self.read_number("DISTANCE?")
    }

    fn light_percent(&mut self) -> Result<i32, ControllerError> {
        self.read_number("LIGHT?")
    }

    fn set_motor_power(&mut self, port: MotorPort, power: i32) -> Result<(), ControllerError> {
        if !self.outputs.contains(&OutputDevice::Motor(port)) {
            return Ok(());
        }
        let answer = self.request(&format!("MOTOR {} {}", port.letter(), power))?;
        if answer != "OK" {
            return Err(ControllerError::Protocol(format!(
                "MOTOR answered '{}'",
                answer
            )));
        }
        Ok(())
    }
}
