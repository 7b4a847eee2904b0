//! Sensor line protocol
//!
//! The ultrasonic sensor writes newline-terminated ASCII lines: either a
//! single distance integer, or a distance and a triggered flag separated by
//! whitespace. Anything else is malformed and discarded without error
//! propagation.

use std::io::Read;

use super::{InputEvent, Mailbox};

/// One parsed reading from the distance sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorReading {
    /// Measured distance, sensor units
    pub distance: i32,
    /// Whether the sensor raised its explicit trigger flag
    pub triggered: bool,
}

/// Parse one sensor line.
///
/// Returns `None` for malformed input: empty lines, non-integer tokens, more
/// than two tokens, or a flag other than 0/1.
pub fn parse_sensor_line(line: &str) -> Option<SensorReading> {
    let mut tokens = line.split_whitespace();
    let distance: i32 = tokens.next()?.parse().ok()?;
    let reading = match tokens.next() {
        None => SensorReading {
            distance,
            triggered: false,
        },
        Some("0") => SensorReading {
            distance,
            triggered: false,
        },
        Some("1") => SensorReading {
            distance,
            triggered: true,
        },
        Some(_) => return None,
    };
    if tokens.next().is_some() {
        return None;
    }
    Some(reading)
}

/// Listener loop body: read bytes, split on newlines, publish every reading
/// that parses. Timeout-flavored errors are retried so a stalled sensor
/// simply stays quiet; any other error ends the listener.
pub(super) fn listen(mut port: Box<dyn Read + Send>, mailbox: Mailbox) {
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        match port.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                for line in drain_lines(&mut pending) {
                    match parse_sensor_line(&line) {
                        Some(reading) => mailbox.publish(InputEvent::Sensor(reading)),
                        None => log::debug!("discarding malformed sensor line {:?}", line),
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                log::error!("sensor read failed: {}", e);
                break;
            }
        }
    }
    log::info!("sensor listener stopped");
}

/// Split complete newline-terminated lines off the front of `pending`,
/// decoding lossily, since the sensor occasionally garbles a byte.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = pending.drain(..=pos).collect();
        lines.push(
            String::from_utf8_lossy(&raw)
                .trim_end_matches(['\n', '\r'])
                .to_string(),
        );
    }
    lines
}
