//! Textual field records.
//!
//! A record is a score line followed by `W` lines of exactly `H` glyphs
//! (`#` wall, `.` open). Records may be concatenated; whitespace between
//! tokens is free-form. The stored score is validated as an integer but
//! otherwise ignored: decoded fields carry score `0` until evaluated.

use std::fmt;

use super::grid::{Dimensions, Field, FieldError, OPEN_GLYPH, WALL_GLYPH};

impl Field {
    /// Renders the record for this field.
    pub fn to_record(&self) -> String {
        self.to_string()
    }

    /// Decodes exactly one record.
    pub fn parse_record(dims: Dimensions, text: &str) -> Result<Field, FieldError> {
        let mut tokens = text.split_whitespace();
        let field = next_record(dims, &mut tokens)?.ok_or(FieldError::MissingRows {
            rows: 0,
            expected: dims.width(),
        })?;
        Ok(field)
    }
}

/// Decodes every record in `text`, in order.
pub fn parse_records(dims: Dimensions, text: &str) -> Result<Vec<Field>, FieldError> {
    let mut tokens = text.split_whitespace();
    let mut fields = Vec::new();
    while let Some(field) = next_record(dims, &mut tokens)? {
        fields.push(field);
    }
    Ok(fields)
}

fn next_record<'a, I>(dims: Dimensions, tokens: &mut I) -> Result<Option<Field>, FieldError>
where
    I: Iterator<Item = &'a str>,
{
    let Some(score) = tokens.next() else {
        return Ok(None);
    };
    score
        .parse::<u64>()
        .map_err(|_| FieldError::InvalidScore(score.to_string()))?;

    let mut walls = Vec::with_capacity(dims.cell_count());
    for x in 0..dims.width() {
        let row = tokens.next().ok_or(FieldError::MissingRows {
            rows: x,
            expected: dims.width(),
        })?;
        let found = row.chars().count();
        if found != dims.height() {
            return Err(FieldError::RowLength {
                row: x,
                found,
                expected: dims.height(),
            });
        }
        for (y, glyph) in row.chars().enumerate() {
            walls.push(match glyph {
                WALL_GLYPH => true,
                OPEN_GLYPH => false,
                _ => return Err(FieldError::UnknownGlyph { glyph, x, y }),
            });
        }
    }

    Field::from_walls(dims, walls).map(Some)
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self.dims();
        writeln!(f, "{}", self.score())?;
        for x in 0..dims.width() {
            let row: String = (0..dims.height())
                .map(|y| if self.is_wall(x, y) { WALL_GLYPH } else { OPEN_GLYPH })
                .collect();
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
