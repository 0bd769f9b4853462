//! Workbook byte builders for tests.
//!
//! `.xlsx` bytes come from `rust_xlsxwriter`; `.xls` bytes are a minimal
//! BIFF8 workbook stream inside an OLE2 compound file, just enough for
//! calamine to read labels and numbers off the first sheet; `.ods` bytes are
//! a stored zip with the mimetype entry and a flat `content.xml`.

use std::io::{Cursor, Write};

use rust_xlsxwriter::{Format, Workbook};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, Copy)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    /// A number shown with a date format (`.xlsx` only; plain number elsewhere).
    Date(f64),
    Empty,
}

pub fn xlsx_bytes(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(r as u32, c as u16, *s).unwrap();
                }
                Cell::Number(n) => {
                    worksheet.write_number(r as u32, c as u16, *n).unwrap();
                }
                Cell::Date(n) => {
                    worksheet
                        .write_number_with_format(r as u32, c as u16, *n, &date_format)
                        .unwrap();
                }
                Cell::Empty => {}
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

// ── ODS ───────────────────────────────────────────────────────────────────────

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const ODS_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

pub fn ods_bytes(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);

    // The mimetype entry must come first and uncompressed.
    zip.start_file("mimetype", options).unwrap();
    zip.write_all(ODS_MIMETYPE.as_bytes()).unwrap();
    zip.start_file("META-INF/manifest.xml", options).unwrap();
    zip.write_all(ODS_MANIFEST.as_bytes()).unwrap();
    zip.start_file("content.xml", options).unwrap();
    zip.write_all(ods_content(rows).as_bytes()).unwrap();

    zip.finish().unwrap().into_inner()
}

fn ods_content(rows: &[Vec<Cell>]) -> String {
    let mut body = String::new();
    for row in rows {
        body.push_str("<table:table-row>");
        for cell in row {
            match cell {
                Cell::Text(s) => body.push_str(&format!(
                    "<table:table-cell office:value-type=\"string\"><text:p>{}</text:p></table:table-cell>",
                    s
                )),
                Cell::Number(n) | Cell::Date(n) => body.push_str(&format!(
                    "<table:table-cell office:value-type=\"float\" office:value=\"{}\"><text:p>{}</text:p></table:table-cell>",
                    n, n
                )),
                Cell::Empty => body.push_str("<table:table-cell></table:table-cell>"),
            }
        }
        body.push_str("</table:table-row>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2"><office:body><office:spreadsheet><table:table table:name="Sheet1">{}</table:table></office:spreadsheet></office:body></office:document-content>"#,
        body
    )
}

// ── BIFF8 ─────────────────────────────────────────────────────────────────────

const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_CODEPAGE: u16 = 0x0042;
const RECORD_WINDOW1: u16 = 0x003D;
const RECORD_FONT: u16 = 0x0031;
const RECORD_XF: u16 = 0x00E0;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_DIMENSIONS: u16 = 0x0200;
const RECORD_WINDOW2: u16 = 0x023E;
const RECORD_NUMBER: u16 = 0x0203;
const RECORD_LABEL: u16 = 0x0204;

const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;
const XF_GENERAL: u16 = 16;

pub fn xls_bytes(rows: &[Vec<Cell>]) -> Vec<u8> {
    let stream = workbook_stream(rows);
    let mut ole = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    {
        let mut s = ole.create_stream("Workbook").unwrap();
        s.write_all(&stream).unwrap();
    }
    ole.into_inner().into_inner()
}

fn workbook_stream(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut globals = Vec::new();
    push_record(&mut globals, RECORD_BOF, &bof(BOF_DT_WORKBOOK_GLOBALS));
    push_record(&mut globals, RECORD_CODEPAGE, &1200u16.to_le_bytes());
    push_record(&mut globals, RECORD_WINDOW1, &window1());
    push_record(&mut globals, RECORD_FONT, &font("Arial"));
    for _ in 0..16 {
        push_record(&mut globals, RECORD_XF, &xf_record(true));
    }
    push_record(&mut globals, RECORD_XF, &xf_record(false));

    let boundsheet_start = globals.len();
    let mut boundsheet = Vec::new();
    boundsheet.extend_from_slice(&0u32.to_le_bytes()); // patched below
    boundsheet.extend_from_slice(&0u16.to_le_bytes());
    boundsheet.push(6);
    boundsheet.push(0);
    boundsheet.extend_from_slice(b"Sheet1");
    push_record(&mut globals, RECORD_BOUNDSHEET, &boundsheet);
    push_record(&mut globals, RECORD_EOF, &[]);

    let sheet_offset = globals.len() as u32;
    let pos = boundsheet_start + 4;
    globals[pos..pos + 4].copy_from_slice(&sheet_offset.to_le_bytes());

    globals.extend_from_slice(&sheet_stream(rows));
    globals
}

fn sheet_stream(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut sheet = Vec::new();
    push_record(&mut sheet, RECORD_BOF, &bof(BOF_DT_WORKSHEET));

    let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u16;
    let mut dims = Vec::new();
    dims.extend_from_slice(&0u32.to_le_bytes());
    dims.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    dims.extend_from_slice(&0u16.to_le_bytes());
    dims.extend_from_slice(&cols.to_le_bytes());
    dims.extend_from_slice(&0u16.to_le_bytes());
    push_record(&mut sheet, RECORD_DIMENSIONS, &dims);
    push_record(&mut sheet, RECORD_WINDOW2, &window2());

    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let mut data = Vec::new();
            data.extend_from_slice(&(r as u16).to_le_bytes());
            data.extend_from_slice(&(c as u16).to_le_bytes());
            data.extend_from_slice(&XF_GENERAL.to_le_bytes());
            match cell {
                Cell::Text(s) => {
                    data.extend_from_slice(&(s.len() as u16).to_le_bytes());
                    data.push(0); // compressed 8-bit chars
                    data.extend_from_slice(s.as_bytes());
                    push_record(&mut sheet, RECORD_LABEL, &data);
                }
                Cell::Number(n) | Cell::Date(n) => {
                    data.extend_from_slice(&n.to_le_bytes());
                    push_record(&mut sheet, RECORD_NUMBER, &data);
                }
                Cell::Empty => {}
            }
        }
    }

    push_record(&mut sheet, RECORD_EOF, &[]);
    sheet
}

fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn bof(dt: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
    out[2..4].copy_from_slice(&dt.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes());
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes());
    out
}

fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[14..16].copy_from_slice(&1u16.to_le_bytes());
    out[16..18].copy_from_slice(&600u16.to_le_bytes());
    out
}

fn window2() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[0..2].copy_from_slice(&0x02B6u16.to_le_bytes());
    out
}

fn font(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&200u16.to_le_bytes()); // 10pt
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x7FFFu16.to_le_bytes()); // automatic color
    out.extend_from_slice(&400u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.push(name.len() as u8);
    out.push(0);
    out.extend_from_slice(name.as_bytes());
    out
}

fn xf_record(is_style_xf: bool) -> [u8; 20] {
    let mut out = [0u8; 20];
    let flags: u16 = 0x0001 | if is_style_xf { 0x0004 } else { 0 };
    out[4..6].copy_from_slice(&flags.to_le_bytes());
    out[6] = 0x20;
    out[9] = 0x3F;
    out
}
