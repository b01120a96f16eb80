//! Supplier workbook codec (`.xlsx`).
//!
//! Export writes one header row plus one row per supplier. Import reads the
//! first worksheet back using the same column order; the code column is
//! ignored because codes are always allocated on creation.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use thiserror::Error;

use ehm_parties::{NewSupplier, Supplier};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SUPPLIER_SHEET: &str = "Suppliers";

/// Header and column width, in sheet order.
pub const SUPPLIER_COLUMNS: [(&str, f64); 11] = [
    ("Supplier Code", 15.0),
    ("Supplier Name", 30.0),
    ("Supplier Type", 20.0),
    ("Telephone", 15.0),
    ("Email", 25.0),
    ("Country", 15.0),
    ("City", 15.0),
    ("Branch", 15.0),
    ("Currency", 10.0),
    ("Tax Number", 15.0),
    ("Status", 10.0),
];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("unreadable workbook: {0}")]
    Read(String),

    #[error("workbook has no worksheet")]
    NoWorksheet,
}

/// One data row read from an uploaded workbook.
#[derive(Debug, Clone)]
pub struct SupplierRow {
    /// 1-based sheet row number, as a spreadsheet user would see it.
    pub row: u32,
    pub supplier: NewSupplier,
}

impl SupplierRow {
    /// Name, telephone, country, city and branch are all present.
    pub fn is_complete(&self) -> bool {
        let s = &self.supplier;
        [&s.supplier_name, &s.telephone, &s.country, &s.city, &s.branch]
            .iter()
            .all(|v| v.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

pub fn write_suppliers(suppliers: &[Supplier]) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SUPPLIER_SHEET)?;

    let bold = Format::new().set_bold();
    for (col, (title, width)) in (0u16..).zip(SUPPLIER_COLUMNS) {
        sheet.write_string_with_format(0, col, title, &bold)?;
        sheet.set_column_width(col, width)?;
    }

    for (row, s) in (1u32..).zip(suppliers) {
        let cells = [
            s.supplier_code.as_str(),
            s.supplier_name.as_str(),
            s.supplier_type.as_str(),
            s.telephone.as_str(),
            s.email.as_deref().unwrap_or_default(),
            s.country.as_str(),
            s.city.as_str(),
            s.branch.as_str(),
            s.currency.as_str(),
            s.tax_number.as_deref().unwrap_or_default(),
            if s.is_active { "Active" } else { "Inactive" },
        ];
        for (col, value) in (0u16..).zip(cells) {
            sheet.write_string(row, col, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    let text = match cell? {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        // Phone numbers typed into a sheet usually come back as floats.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Read supplier rows from the first worksheet, skipping the header row and
/// rows with no values at all.
pub fn read_suppliers(bytes: &[u8]) -> Result<Vec<SupplierRow>, SheetError> {
    let mut book: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| SheetError::Read(e.to_string()))?;
    let range = book
        .worksheet_range_at(0)
        .ok_or(SheetError::NoWorksheet)?
        .map_err(|e| SheetError::Read(e.to_string()))?;

    let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for r in first_row.max(1)..=last_row {
        let cell = |col: u32| cell_text(range.get_value((r, col)));
        let values: Vec<Option<String>> = (1..=9).map(cell).collect();
        if values.iter().all(Option::is_none) {
            continue;
        }
        let mut values = values.into_iter();
        let mut next = || values.next().flatten();
        let supplier = NewSupplier {
            supplier_name: next(),
            supplier_type: next(),
            telephone: next(),
            email: next(),
            country: next(),
            city: next(),
            branch: next(),
            currency: next(),
            tax_number: next(),
            ..NewSupplier::default()
        };
        rows.push(SupplierRow { row: r + 1, supplier });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn supplier(code: &str, name: &str, phone: &str) -> Supplier {
        NewSupplier {
            supplier_name: Some(name.into()),
            supplier_type: Some("Air Transport".into()),
            telephone: Some(phone.into()),
            email: Some(format!("{phone}@air.eg")),
            country: Some("Egypt".into()),
            city: Some("Cairo".into()),
            branch: Some("Head Office".into()),
            tax_number: Some("TX-9".into()),
            ..NewSupplier::default()
        }
        .into_supplier(code.into(), None, Utc::now())
        .unwrap()
    }

    #[test]
    fn exported_rows_read_back_without_codes() {
        let bytes = write_suppliers(&[supplier("SUP000001", "Sky", "0200"), supplier("SUP000002", "Jet", "0201")])
            .unwrap();
        let rows = read_suppliers(&bytes).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[1].row, 3);
        let first = &rows[0].supplier;
        assert_eq!(first.supplier_name.as_deref(), Some("Sky"));
        assert_eq!(first.supplier_type.as_deref(), Some("Air Transport"));
        assert_eq!(first.email.as_deref(), Some("0200@air.eg"));
        assert_eq!(first.tax_number.as_deref(), Some("TX-9"));
        assert!(rows.iter().all(SupplierRow::is_complete));
    }

    #[test]
    fn numeric_phones_and_blank_cells() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 1, "Supplier Name").unwrap();
        sheet.write_string(1, 1, "Nile Cruises").unwrap();
        sheet.write_number(1, 3, 1001234567.0).unwrap();
        sheet.write_string(1, 5, "Egypt").unwrap();
        sheet.write_string(3, 1, "Orphan").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = read_suppliers(&bytes).unwrap();
        // Row 3 is entirely blank and skipped.
        assert_eq!(rows.iter().map(|r| r.row).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(rows[0].supplier.telephone.as_deref(), Some("1001234567"));
        assert!(!rows[0].is_complete());
        assert!(!rows[1].is_complete());
    }

    #[test]
    fn garbage_is_unreadable() {
        assert!(matches!(read_suppliers(b"not a workbook"), Err(SheetError::Read(_))));
    }
}
