use std::io::Cursor;

use calamine::{Data, DataType, Range, Reader, Xlsx};

use crate::error::ExtractError;

/// Comma separated text of the first worksheet in declared order.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Ok(String::new());
    };
    let range = workbook.worksheet_range(&first)?;
    sheet_to_csv(&range)
}

/// Rows separated by `\n` with no trailing newline. Fields are quoted only when
/// they contain a delimiter, quote or line break.
fn sheet_to_csv(range: &Range<Data>) -> Result<String, ExtractError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in range.rows() {
        writer.write_record(row.iter().map(cell_text))?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut csv = String::from_utf8_lossy(&bytes).into_owned();
    if csv.ends_with('\n') {
        csv.pop();
    }
    Ok(csv)
}

/// Date cells print as ISO dates (`2023-03-14`), with the time appended only
/// when it is not midnight. Durations and every other cell keep calamine's
/// display of the stored value.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(excel) if !excel.is_duration() => match cell.as_datetime() {
            Some(at) if at.date().and_hms_opt(0, 0, 0) == Some(at) => at.date().to_string(),
            Some(at) => at.to_string(),
            None => cell.to_string(),
        },
        _ => cell.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    fn two_sheet_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let summary = workbook.add_worksheet();
        summary.set_name("Summary").unwrap();
        summary.write_string(0, 0, "item").unwrap();
        summary.write_string(0, 1, "qty").unwrap();
        summary.write_string(1, 0, "apples, red").unwrap();
        summary.write_number(1, 1, 3).unwrap();
        summary.write_string(2, 0, "pears").unwrap();
        summary.write_number(2, 1, 2.5).unwrap();

        let hidden = workbook.add_worksheet();
        hidden.set_name("Secrets").unwrap();
        hidden.write_string(0, 0, "launch codes").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_first_sheet_only() {
        let csv = extract(&two_sheet_workbook()).unwrap();
        assert_eq!(csv, "item,qty\n\"apples, red\",3\npears,2.5");
        assert!(!csv.contains("launch codes"));
    }

    #[test]
    fn test_not_a_workbook() {
        assert!(extract(b"not a zip").is_err());
    }

    #[test]
    fn test_dates_are_iso_text() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let day = Format::new().set_num_format("yyyy-mm-dd");
        let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm");

        sheet.write_string(0, 0, "due").unwrap();
        sheet.write_string(0, 1, "sent").unwrap();
        let due = ExcelDateTime::from_ymd(2023, 3, 14).unwrap();
        let sent = ExcelDateTime::from_ymd(2023, 3, 14)
            .unwrap()
            .and_hms(9, 30, 0)
            .unwrap();
        sheet.write_datetime_with_format(1, 0, &due, &day).unwrap();
        sheet.write_datetime_with_format(1, 1, &sent, &stamp).unwrap();

        let csv = extract(&workbook.save_to_buffer().unwrap()).unwrap();
        assert_eq!(csv, "due,sent\n2023-03-14,2023-03-14 09:30:00");
    }

    #[test]
    fn test_iso_text_cells_pass_through() {
        assert_eq!(
            cell_text(&Data::DateTimeIso("2024-01-02T03:04:05".into())),
            "2024-01-02T03:04:05"
        );
        assert_eq!(cell_text(&Data::Float(0.5)), "0.5");
        assert_eq!(cell_text(&Data::Empty), "");
    }
}
