//! Interactive jog commands: parsing the `verb args...` command line and
//! rendering the reply for the operator.

use crate::device::JogReply;
use crate::error::SessionError;

/// A primitive motion/draw command for an interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum JogCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    GoTo { x: f64, y: f64 },
    Move { dx: f64, dy: f64 },
    Line { dx: f64, dy: f64 },
    Go { dx: f64, dy: f64 },
    PenUp,
    PenDown,
    /// Absolute move to the origin.
    Home,
    Delay { ms: u64 },
    DrawPath(Vec<(f64, f64)>),
    TurtlePos,
    CurrentPos,
}

impl JogCommand {
    /// Parses a whitespace-separated command line. Verbs are case-insensitive.
    pub fn parse(line: &str) -> Result<Self, SessionError> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(SessionError::MalformedArguments("empty command".into()));
        };
        let verb = verb.to_lowercase();
        let args: Vec<&str> = parts.collect();

        let command = match verb.as_str() {
            "moveto" => {
                let (x, y) = pair(&verb, &args)?;
                JogCommand::MoveTo { x, y }
            }
            "lineto" => {
                let (x, y) = pair(&verb, &args)?;
                JogCommand::LineTo { x, y }
            }
            "goto" => {
                let (x, y) = pair(&verb, &args)?;
                JogCommand::GoTo { x, y }
            }
            "move" => {
                let (dx, dy) = pair(&verb, &args)?;
                JogCommand::Move { dx, dy }
            }
            "line" => {
                let (dx, dy) = pair(&verb, &args)?;
                JogCommand::Line { dx, dy }
            }
            "go" => {
                let (dx, dy) = pair(&verb, &args)?;
                JogCommand::Go { dx, dy }
            }
            "penup" => nullary(&verb, &args, JogCommand::PenUp)?,
            "pendown" => nullary(&verb, &args, JogCommand::PenDown)?,
            "home" => nullary(&verb, &args, JogCommand::Home)?,
            "turtle_pos" => nullary(&verb, &args, JogCommand::TurtlePos)?,
            "current_pos" => nullary(&verb, &args, JogCommand::CurrentPos)?,
            "delay" => {
                let [ms] = args.as_slice() else {
                    return Err(arity(&verb, "1 integer (milliseconds)"));
                };
                let ms = ms.parse::<u64>().map_err(|_| {
                    SessionError::MalformedArguments(format!(
                        "delay expects an integer, got '{ms}'"
                    ))
                })?;
                JogCommand::Delay { ms }
            }
            "draw_path" => {
                if args.len() < 4 || args.len() % 2 != 0 {
                    return Err(SessionError::MalformedArguments(
                        "draw_path requires at least 4 numbers (x1 y1 x2 y2 ...)".into(),
                    ));
                }
                let coords = args
                    .iter()
                    .map(|arg| number(&verb, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                JogCommand::DrawPath(coords.chunks(2).map(|c| (c[0], c[1])).collect())
            }
            _ => return Err(SessionError::InvalidCommand(verb)),
        };
        Ok(command)
    }

    /// Human-readable confirmation for a successful command.
    pub fn describe(&self, reply: JogReply) -> String {
        match (self, reply) {
            (JogCommand::TurtlePos, JogReply::Position(x, y)) => {
                format!("turtle_pos: ({x:.4}, {y:.4})")
            }
            (JogCommand::CurrentPos, JogReply::Position(x, y)) => {
                format!("current_pos: ({x:.4}, {y:.4})")
            }
            // Debug keeps the decimal point on whole numbers: "1.0", not "1".
            (JogCommand::MoveTo { x, y } | JogCommand::GoTo { x, y }, _) => {
                format!("moved to ({x:?}, {y:?})")
            }
            (JogCommand::LineTo { x, y }, _) => format!("drew line to ({x:?}, {y:?})"),
            (JogCommand::Move { dx, dy } | JogCommand::Go { dx, dy }, _) => {
                format!("moved by ({dx:?}, {dy:?})")
            }
            (JogCommand::Line { dx, dy }, _) => format!("drew line by ({dx:?}, {dy:?})"),
            (JogCommand::PenUp, _) => "pen up".to_string(),
            (JogCommand::PenDown, _) => "pen down".to_string(),
            (JogCommand::Home, _) => "moved to home (0, 0)".to_string(),
            (JogCommand::Delay { ms }, _) => format!("delayed {ms} ms"),
            (JogCommand::DrawPath(points), _) => {
                format!("drew path with {} points", points.len())
            }
            (JogCommand::TurtlePos | JogCommand::CurrentPos, JogReply::Done) => {
                "position unavailable".to_string()
            }
        }
    }
}

fn nullary(verb: &str, args: &[&str], command: JogCommand) -> Result<JogCommand, SessionError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(arity(verb, "no arguments"))
    }
}

fn pair(verb: &str, args: &[&str]) -> Result<(f64, f64), SessionError> {
    let [a, b] = args else {
        return Err(arity(verb, "2 numbers"));
    };
    Ok((number(verb, a)?, number(verb, b)?))
}

fn number(verb: &str, arg: &str) -> Result<f64, SessionError> {
    arg.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            SessionError::MalformedArguments(format!("{verb} expects numbers, got '{arg}'"))
        })
}

fn arity(verb: &str, expected: &str) -> SessionError {
    SessionError::MalformedArguments(format!("{verb} takes {expected}"))
}
