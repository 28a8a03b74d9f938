use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::errors::ExportError;
use crate::model::{Grade, ScoredTestcase};

pub const SHEET_NAME: &str = "Testcases";

pub const HEADERS: [&str; 11] = [
    "항목번호",
    "대분류",
    "중분류",
    "소분류",
    "구분",
    "테스트 내용",
    "테스트 조건",
    "기대 결과",
    "비고",
    "점수",
    "등급",
];

/// Template column widths, in header order.
const TEMPLATE_WIDTHS: [f64; 11] = [10.0, 15.0, 15.0, 15.0, 10.0, 40.0, 30.0, 30.0, 15.0, 10.0, 10.0];
/// Columns centered in the template: item number, kind, score, grade.
const CENTERED: [u16; 4] = [0, 4, 9, 10];
const TEMPLATE_EMPTY_ROWS: u32 = 10;

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xE0E0E0))
        .set_align(FormatAlign::Center)
}

pub fn score_label(score: u32) -> String {
    format!("{}점", score)
}

/// Cell text for every column after the item number, one row per test case. The item
/// number is written as a number by the workbook writer.
pub fn rows(testcases: &[ScoredTestcase]) -> Vec<[String; 10]> {
    testcases
        .iter()
        .map(|tc| {
            [
                tc.draft.major.clone(),
                tc.draft.medium.clone(),
                tc.draft.minor.clone(),
                tc.draft.kind.label().to_string(),
                tc.draft.description.clone(),
                tc.draft.precondition.clone(),
                tc.draft.expected_result.clone(),
                tc.draft.notes.clone(),
                score_label(tc.score),
                Grade::from_score(tc.score).glyph().to_string(),
            ]
        })
        .collect()
}

fn write_headers(sheet: &mut Worksheet, format: &Format) -> Result<(), ExportError> {
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}

/// Workbook bytes for the scored test cases.
pub fn testcases_workbook(testcases: &[ScoredTestcase]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    write_headers(sheet, &header_format())?;

    for (i, row) in rows(testcases).iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, (i + 1) as f64)?;
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(r, col as u16 + 1, value)?;
        }
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

pub fn write_testcases(path: &Path, testcases: &[ScoredTestcase]) -> Result<(), ExportError> {
    let bytes = testcases_workbook(testcases)?;
    write_file(path, &bytes)?;
    tracing::info!(path = %path.display(), rows = testcases.len(), "spreadsheet written");
    Ok(())
}

/// Blank template: fixed widths, bordered cells, one example row and ten numbered
/// empty rows.
pub fn template_workbook() -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, width) in TEMPLATE_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    let border = Format::new().set_border(FormatBorder::Thin);
    let cell = border.clone().set_align(FormatAlign::VerticalCenter);
    let centered = border
        .clone()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    write_headers(sheet, &header_format().set_border(FormatBorder::Thin).set_align(FormatAlign::VerticalCenter))?;

    let example = [
        "시스템",
        "로그인",
        "오류 메시지",
        "예외",
        "로그인 실패 메시지 확인",
        "잘못된 ID/PW 입력 시",
        "오류 메시지 정확히 출력",
        "-",
    ];
    sheet.write_number_with_format(1, 0, 1.0, &centered)?;
    for (i, value) in example.iter().enumerate() {
        let col = i as u16 + 1;
        let format = if CENTERED.contains(&col) { &centered } else { &cell };
        sheet.write_string_with_format(1, col, *value, format)?;
    }
    sheet.write_number_with_format(1, 9, 95.0, &centered)?;
    sheet.write_string_with_format(1, 10, Grade::Green.glyph(), &centered)?;

    for row in 2..2 + TEMPLATE_EMPTY_ROWS {
        sheet.write_number_with_format(row, 0, row as f64, &centered)?;
        for col in 1..HEADERS.len() as u16 {
            let format = if CENTERED.contains(&col) { &centered } else { &border };
            sheet.write_blank(row, col, format)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn write_template(path: &Path) -> Result<(), ExportError> {
    let bytes = template_workbook()?;
    write_file(path, &bytes)?;
    tracing::info!(path = %path.display(), "template written");
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |e: std::io::Error| ExportError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, bytes).map_err(write_err)
}
