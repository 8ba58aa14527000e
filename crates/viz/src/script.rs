//! Edit script parsing.
//!
//! One command per line. Blank lines and lines starting with `#` are ignored.
//!
//! ```text
//! add rect X Y W H [COLOR]
//! add ellipse X Y RX RY [COLOR]
//! add text X Y TEXT...
//! move ID DX DY
//! rotate ID DEGREES
//! fill ID COLOR
//! remove ID
//! clear | undo | redo | reset | status
//! ```

use anyhow::{anyhow, bail, Context, Result};
use viz_canvas::{ShapeId, ShapeKind};
use viz_config::HexColor;

/// Font size for `add text`.
const TEXT_SIZE: f32 = 32.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        kind: ShapeKind,
        x: f32,
        y: f32,
        fill: Option<HexColor>,
    },
    Move {
        id: ShapeId,
        dx: f32,
        dy: f32,
    },
    Rotate {
        id: ShapeId,
        degrees: f32,
    },
    Fill {
        id: ShapeId,
        color: HexColor,
    },
    Remove {
        id: ShapeId,
    },
    Clear,
    Undo,
    Redo,
    Reset,
    Status,
}

/// A parsed command with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub command: Command,
}

/// Parses a whole script.
///
/// # Errors
///
/// Returns the first malformed line, with its line number.
pub fn parse_script(source: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        if let Some(command) = parse_line(raw).with_context(|| format!("line {number}: {raw:?}"))? {
            lines.push(Line { number, command });
        }
    }
    Ok(lines)
}

/// Parses one line. Returns `None` for blank lines and comments.
///
/// # Errors
///
/// Returns an error for unknown commands or malformed arguments.
pub fn parse_line(raw: &str) -> Result<Option<Command>> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb {
        "add" => parse_add(&args)?,
        "move" => {
            expect_args(verb, &args, 3)?;
            Command::Move {
                id: parse_id(args[0])?,
                dx: parse_num(args[1])?,
                dy: parse_num(args[2])?,
            }
        }
        "rotate" => {
            expect_args(verb, &args, 2)?;
            Command::Rotate {
                id: parse_id(args[0])?,
                degrees: parse_num(args[1])?,
            }
        }
        "fill" => {
            expect_args(verb, &args, 2)?;
            Command::Fill {
                id: parse_id(args[0])?,
                color: args[1].parse()?,
            }
        }
        "remove" => {
            expect_args(verb, &args, 1)?;
            Command::Remove {
                id: parse_id(args[0])?,
            }
        }
        "clear" | "undo" | "redo" | "reset" | "status" => {
            expect_args(verb, &args, 0)?;
            match verb {
                "clear" => Command::Clear,
                "undo" => Command::Undo,
                "redo" => Command::Redo,
                "reset" => Command::Reset,
                _ => Command::Status,
            }
        }
        other => bail!("unknown command {other:?}"),
    };
    Ok(Some(command))
}

fn parse_add(args: &[&str]) -> Result<Command> {
    let (&shape, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("add needs a shape: rect, ellipse or text"))?;
    if rest.len() < 2 {
        bail!("add {shape} needs X and Y");
    }
    let x = parse_num(rest[0])?;
    let y = parse_num(rest[1])?;
    let rest = &rest[2..];

    let (kind, fill) = match shape {
        "rect" | "ellipse" => {
            if !(2..=3).contains(&rest.len()) {
                bail!("add {shape} takes two sizes and an optional color");
            }
            let a = parse_num(rest[0])?;
            let b = parse_num(rest[1])?;
            if a <= 0.0 || b <= 0.0 {
                bail!("add {shape}: sizes must be positive");
            }
            let fill = rest.get(2).map(|c| c.parse::<HexColor>()).transpose()?;
            let kind = if shape == "rect" {
                ShapeKind::Rect {
                    width: a,
                    height: b,
                }
            } else {
                ShapeKind::Ellipse { rx: a, ry: b }
            };
            (kind, fill)
        }
        "text" => {
            if rest.is_empty() {
                bail!("add text needs some text");
            }
            let kind = ShapeKind::Text {
                content: rest.join(" "),
                size: TEXT_SIZE,
            };
            (kind, None)
        }
        other => bail!("unknown shape {other:?}"),
    };
    Ok(Command::Add { kind, x, y, fill })
}

fn expect_args(verb: &str, args: &[&str], n: usize) -> Result<()> {
    if args.len() != n {
        bail!("{verb} takes {n} argument(s), got {}", args.len());
    }
    Ok(())
}

fn parse_num(s: &str) -> Result<f32> {
    let n: f32 = s.parse().with_context(|| format!("not a number: {s:?}"))?;
    if !n.is_finite() {
        bail!("not a finite number: {s:?}");
    }
    Ok(n)
}

fn parse_id(s: &str) -> Result<ShapeId> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    let id = digits
        .parse()
        .with_context(|| format!("not a shape id: {s:?}"))?;
    Ok(ShapeId(id))
}
