//! Operator console lines.
//!
//! Anything that is not a `sim` command is handed to the dispatcher as a
//! directive payload.  `sim` commands steer the simulated robot's sensors:
//!
//! ```text
//! sim distance 40
//! sim angle 180
//! sim touch off
//! ```

use fetchbot_hal::SimRobot;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleLine {
    Sim(SimInput),
    Directive(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimInput {
    Distance(f32),
    Angle(f32),
    Touch(bool),
}

impl SimInput {
    /// Set the resting value of the matching simulated sensor.
    pub fn apply(self, sim: &SimRobot) {
        match self {
            SimInput::Distance(cm) => sim.set_distance(cm),
            SimInput::Angle(deg) => sim.set_angle(deg),
            SimInput::Touch(pressed) => sim.set_touch(pressed),
        }
    }
}

pub fn parse(line: &str) -> Result<ConsoleLine, String> {
    let mut words = line.split_whitespace();
    if words.next() != Some("sim") {
        return Ok(ConsoleLine::Directive(line.to_string()));
    }
    let (sensor, value) = match (words.next(), words.next(), words.next()) {
        (Some(sensor), Some(value), None) => (sensor, value),
        _ => return Err("usage: sim <distance|angle|touch> <value>".to_string()),
    };
    let number = || {
        value
            .parse::<f32>()
            .map_err(|_| format!("'{value}' is not a number"))
    };
    let input = match sensor {
        "distance" => SimInput::Distance(number()?),
        "angle" => SimInput::Angle(number()?),
        "touch" => SimInput::Touch(match value {
            "on" | "true" | "pressed" | "1" => true,
            "off" | "false" | "released" | "0" => false,
            other => return Err(format!("'{other}' is not a touch state")),
        }),
        other => return Err(format!("unknown sensor '{other}'")),
    };
    Ok(ConsoleLine::Sim(input))
}
