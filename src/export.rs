//! Roster export as CSV and as a single-sheet xlsx workbook.

use anyhow::Context;
use rusqlite::Connection;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::attendance;
use crate::roster::{self, Student};

pub const EXPORT_COLUMNS: [&str; 11] = [
    "id",
    "name",
    "grade",
    "father_name",
    "mother_name",
    "national_id",
    "birth_date",
    "phone",
    "alt_phone",
    "login_id",
    "created_at",
];
pub const SHEET_NAME: &str = "Students";

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn row_values(s: &Student) -> [String; 11] {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    [
        s.id.to_string(),
        s.name.clone(),
        s.grade.map(|g| g.as_str().to_string()).unwrap_or_default(),
        opt(&s.father_name),
        opt(&s.mother_name),
        opt(&s.national_id),
        s.birth_date.clone(),
        opt(&s.phone),
        opt(&s.alt_phone),
        opt(&s.login_id),
        s.created_at.clone(),
    ]
}

pub fn students_csv(conn: &Connection) -> anyhow::Result<(String, usize)> {
    let students = roster::list_students(conn, None)?;
    let mut csv = EXPORT_COLUMNS.join(",");
    csv.push('\n');
    for s in &students {
        let line: Vec<String> = row_values(s).iter().map(|v| csv_quote(v)).collect();
        csv.push_str(&line.join(","));
        csv.push('\n');
    }
    Ok((csv, students.len()))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    Ok(())
}

pub fn write_students_csv(conn: &Connection, out_path: &Path) -> anyhow::Result<usize> {
    let (csv, rows) = students_csv(conn)?;
    ensure_parent(out_path)?;
    std::fs::write(out_path, csv)
        .with_context(|| format!("failed to write {}", out_path.to_string_lossy()))?;
    Ok(rows)
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab, newline and CR are not legal XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

/// Zero-based column index to a spreadsheet column name (0 -> A, 26 -> AA).
fn column_name(mut idx: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

enum Cell {
    Text(String),
    Number(i64),
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
    );
    for (r, row) in rows.iter().enumerate() {
        let row_no = r + 1;
        xml.push_str(&format!("<row r=\"{}\">", row_no));
        for (c, cell) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), row_no);
            match cell {
                Cell::Text(t) if t.is_empty() => {}
                Cell::Text(t) => xml.push_str(&format!(
                    "<c r=\"{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    cell_ref,
                    xml_escape(t)
                )),
                Cell::Number(n) => {
                    xml.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", cell_ref, n))
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

const CONTENT_TYPES_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>\
</Types>";

const ROOT_RELS_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>\
</Relationships>";

const WORKBOOK_RELS_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>\
</Relationships>";

fn workbook_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>",
        SHEET_NAME
    )
}

/// Same rows as the CSV export plus `total_present` and `total_absent`.
pub fn write_students_xlsx(conn: &Connection, out_path: &Path) -> anyhow::Result<usize> {
    let students = roster::list_students(conn, None)?;
    let totals = attendance::summaries(conn)?;

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(students.len() + 1);
    let mut header: Vec<Cell> = EXPORT_COLUMNS
        .iter()
        .map(|c| Cell::Text(c.to_string()))
        .collect();
    header.push(Cell::Text("total_present".into()));
    header.push(Cell::Text("total_absent".into()));
    rows.push(header);
    for s in &students {
        let t = totals.get(&s.id).copied().unwrap_or_default();
        let mut row: Vec<Cell> = Vec::with_capacity(EXPORT_COLUMNS.len() + 2);
        row.push(Cell::Number(s.id));
        row.extend(row_values(s).into_iter().skip(1).map(Cell::Text));
        row.push(Cell::Number(t.present));
        row.push(Cell::Number(t.absent));
        rows.push(row);
    }

    ensure_parent(out_path)?;
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let workbook = workbook_xml();
    let sheet = sheet_xml(&rows);
    let entries: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("xl/workbook.xml", workbook.as_str()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ];
    for (name, body) in entries {
        zip.start_file(name, opts)
            .with_context(|| format!("failed to start {} entry", name))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write {} entry", name))?;
    }
    zip.finish().context("failed to finalize workbook")?;
    Ok(students.len())
}
