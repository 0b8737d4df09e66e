//! Minimal SGF game record reader.
//!
//! Only what the distiller needs is understood: board size, komi, result,
//! setup stones (to reject them) and the main line of `B`/`W` moves. The
//! first variation is followed wherever the record branches.

use crate::constants::{N, PASS_MOVE, STANDARD_KOMI};
use crate::position::{Color, Point, point_at};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SgfError {
    #[error("record is not terminated")]
    Unterminated,
    #[error("record has no result")]
    MissingResult,
    #[error("unsupported result {0:?}")]
    InvalidResult(String),
    #[error("board size {0} is not supported")]
    SizeMismatch(usize),
    #[error("invalid komi {0:?}")]
    InvalidKomi(String),
    #[error("invalid coordinate {0:?}")]
    InvalidCoordinate(String),
    #[error("moves do not alternate starting with black")]
    IrregularPlayOrder,
    #[error("record uses handicap or setup stones")]
    SetupStones,
}

/// A parsed game record.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub size: usize,
    pub komi: f32,
    /// `None` for a draw.
    pub winner: Option<Color>,
    /// Main line moves, Black first, passes as `PASS_MOVE`.
    pub moves: Vec<Point>,
}

impl GameRecord {
    /// Whether the game used one of the usual komi values.
    pub fn has_standard_komi(&self) -> bool {
        STANDARD_KOMI.contains(&self.komi)
    }
}

/// Parse the main line of an SGF record.
pub fn parse_sgf(text: &str) -> Result<GameRecord, SgfError> {
    let props = main_line_properties(text)?;

    let mut size = 19;
    let mut komi = 0.0;
    let mut result = None;
    let mut moves = Vec::new();

    for (ident, value) in &props {
        match ident.as_str() {
            "SZ" => {
                size = value
                    .trim()
                    .parse()
                    .map_err(|_| SgfError::SizeMismatch(0))?;
            }
            "KM" => {
                komi = value
                    .trim()
                    .parse()
                    .map_err(|_| SgfError::InvalidKomi(value.clone()))?;
            }
            "RE" => result = Some(value.trim().to_string()),
            "AB" | "AW" => return Err(SgfError::SetupStones),
            "HA" => {
                if value.trim().parse::<u32>().unwrap_or(0) > 0 {
                    return Err(SgfError::SetupStones);
                }
            }
            "B" | "W" => {
                let color = if ident == "B" { Color::Black } else { Color::White };
                moves.push((color, value.as_str()));
            }
            _ => {}
        }
    }

    if size != N {
        return Err(SgfError::SizeMismatch(size));
    }
    let winner = parse_result(result.as_deref().ok_or(SgfError::MissingResult)?)?;

    let mut plays = Vec::with_capacity(moves.len());
    for (i, (color, value)) in moves.into_iter().enumerate() {
        let expected = if i % 2 == 0 { Color::Black } else { Color::White };
        if color != expected {
            return Err(SgfError::IrregularPlayOrder);
        }
        plays.push(parse_point(value)?);
    }

    Ok(GameRecord {
        size,
        komi,
        winner,
        moves: plays,
    })
}

fn parse_result(re: &str) -> Result<Option<Color>, SgfError> {
    let upper = re.to_ascii_uppercase();
    if upper.starts_with("B+") {
        Ok(Some(Color::Black))
    } else if upper.starts_with("W+") {
        Ok(Some(Color::White))
    } else if upper == "0" || upper == "DRAW" || upper == "JIGO" {
        Ok(None)
    } else {
        Err(SgfError::InvalidResult(re.to_string()))
    }
}

/// SGF point value: `""` and `"tt"` are passes, otherwise column then row
/// letters counted from the top left corner.
fn parse_point(value: &str) -> Result<Point, SgfError> {
    let v = value.trim();
    if v.is_empty() || v == "tt" {
        return Ok(PASS_MOVE);
    }
    let invalid = || SgfError::InvalidCoordinate(value.to_string());
    let &[c, r] = v.as_bytes() else {
        return Err(invalid());
    };
    if !c.is_ascii_lowercase() || !r.is_ascii_lowercase() {
        return Err(invalid());
    }
    let (col, row) = ((c - b'a') as usize, (r - b'a') as usize);
    if col >= N || row >= N {
        return Err(invalid());
    }
    Ok(point_at(row, col))
}

/// Collect `(identifier, value)` pairs along the main line, one pair per value.
fn main_line_properties(text: &str) -> Result<Vec<(String, String)>, SgfError> {
    let mut chars = text.chars();
    let mut props = Vec::new();
    let mut ident = String::new();
    let mut in_ident = false;
    let mut started = false;

    while let Some(c) = chars.next() {
        match c {
            '(' if !started => started = true,
            // Nested variations: keep following the first one.
            '(' => {}
            ')' if started => return Ok(props),
            ';' => {
                ident.clear();
                in_ident = false;
            }
            '[' if started => {
                in_ident = false;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        Some(']') => break,
                        Some(v) => value.push(v),
                        None => return Err(SgfError::Unterminated),
                    }
                }
                props.push((ident.clone(), value));
            }
            // Lowercase letters of old-style long names are skipped.
            c if started && c.is_ascii_uppercase() => {
                if !in_ident {
                    ident.clear();
                    in_ident = true;
                }
                ident.push(c);
            }
            _ => {}
        }
    }

    Err(SgfError::Unterminated)
}
