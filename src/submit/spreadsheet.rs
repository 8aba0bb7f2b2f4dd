use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use thiserror::Error;

use crate::certportal::TeamMember;

/// First data row of the halal-team template, zero-based. Rows 1–13 of the
/// workbook are headings and instructions.
const TEAM_DATA_START_ROW: usize = 13;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no worksheet")]
    NoWorksheet,
}

/// Parse the team-commitment workbook uploaded with the form.
///
/// Columns are number / name / title; reading stops at the first row with an
/// empty number cell, matching how the template is filled in.
pub fn parse_team_workbook(path: &Path) -> Result<Vec<TeamMember>, SpreadsheetError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;
    Ok(members_from_range(&range))
}

fn members_from_range(range: &Range<Data>) -> Vec<TeamMember> {
    let mut members = Vec::new();
    for row in range.rows().skip(TEAM_DATA_START_ROW) {
        let Some(number) = cell_text(row.first()) else {
            break;
        };
        members.push(TeamMember {
            nomor: number,
            nama: cell_text(row.get(1)).unwrap_or_default(),
            jabatan: cell_text(row.get(2)).unwrap_or_default(),
        });
    }
    members
}

/// Cell content as trimmed text; empty and blank cells are `None`. Numbers
/// are rendered without a trailing `.0` since the template's number column is
/// usually numeric.
fn cell_text(cell: Option<&Data>) -> Option<String> {
    let text = match cell? {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}
