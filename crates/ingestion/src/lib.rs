//! Reads the four raw input files of a data directory into a `RawSnapshot`.
//!
//! Each relation is read from `<data_dir>/<table_name>.csv`. Nothing is
//! written anywhere: the caller decides what to do with a complete snapshot,
//! and an error on any file means no snapshot at all.

use core_types::{RawSnapshot, Relation};
use std::path::Path;
use std::time::Instant;

pub mod error;
pub mod reader;

pub use error::IngestError;
pub use reader::{NumericFields, read_records, required_columns};

/// Loads all four relations from `data_dir`.
pub fn load_snapshot(data_dir: &Path) -> Result<RawSnapshot, IngestError> {
    load_snapshot_with(data_dir, |_, _| {})
}

/// Loads all four relations from `data_dir`, calling `on_loaded` with the row
/// count after each relation has been read.
pub fn load_snapshot_with<F>(data_dir: &Path, mut on_loaded: F) -> Result<RawSnapshot, IngestError>
where
    F: FnMut(Relation, usize),
{
    let mut snapshot = RawSnapshot::default();

    for relation in Relation::ALL {
        let path = data_dir.join(relation.file_name());
        let started = Instant::now();
        tracing::info!(relation = %relation, path = %path.display(), "Reading input file.");

        let rows = match relation {
            Relation::Purchases => {
                snapshot.purchases = read_records(&path, relation)?;
                snapshot.purchases.len()
            }
            Relation::PurchasePrices => {
                snapshot.purchase_prices = read_records(&path, relation)?;
                snapshot.purchase_prices.len()
            }
            Relation::VendorInvoice => {
                snapshot.vendor_invoices = read_records(&path, relation)?;
                snapshot.vendor_invoices.len()
            }
            Relation::Sales => {
                snapshot.sales = read_records(&path, relation)?;
                snapshot.sales.len()
            }
        };

        tracing::info!(
            relation = %relation,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Input file read."
        );
        on_loaded(relation, rows);
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_inputs(dir: &Path) {
        fs::write(
            dir.join("purchases.csv"),
            "InventoryId,VendorNumber,VendorName,Brand,Description,PurchasePrice,Quantity,Dollars\n\
             1_HARDERSFIELD_58,105,ALTAMAR BRANDS LLC   ,8412,Tequila Ocho Plata Fresno ,35.71,6,214.26\n\
             2_HARDERSFIELD_58,105,ALTAMAR BRANDS LLC   ,8412,Tequila Ocho Plata Fresno ,35.71,4,142.84\n",
        )
        .unwrap();
        fs::write(
            dir.join("purchase_prices.csv"),
            "Brand,Description,Price,Size,Volume,VendorNumber\n\
             8412,Tequila Ocho Plata Fresno,49.99,750mL,750,105\n\
             58,Gekkeikan Black & Gold Sake,12.99,750mL,Unknown,8320\n",
        )
        .unwrap();
        fs::write(
            dir.join("vendor_invoice.csv"),
            "VendorNumber,VendorName,PONumber,Quantity,Dollars,Freight\n\
             105,ALTAMAR BRANDS LLC,8124,10,357.10,1.57\n\
             105,ALTAMAR BRANDS LLC,8125,1,35.71,\n",
        )
        .unwrap();
        fs::write(
            dir.join("sales.csv"),
            "VendorNo,Brand,SalesQuantity,SalesDollars,SalesPrice,ExciseTax\n\
             105,8412,2,99.98,49.99,0.79\n",
        )
        .unwrap();
    }

    #[test]
    fn loads_all_relations_and_ignores_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        let mut seen = Vec::new();
        let snapshot = load_snapshot_with(dir.path(), |relation, rows| seen.push((relation, rows))).unwrap();

        assert_eq!(
            seen,
            vec![
                (Relation::Purchases, 2),
                (Relation::PurchasePrices, 2),
                (Relation::VendorInvoice, 2),
                (Relation::Sales, 1),
            ]
        );
        assert_eq!(snapshot.purchases[0].vendor_name, "ALTAMAR BRANDS LLC");
        assert_eq!(snapshot.purchases[1].dollars, Some(142.84));
        assert_eq!(snapshot.purchase_prices[1].volume.as_deref(), Some("Unknown"));
        assert_eq!(snapshot.vendor_invoices[0].freight, Some(1.57));
        assert_eq!(snapshot.vendor_invoices[1].freight, None);
        assert_eq!(snapshot.sales[0].excise_tax, Some(0.79));
    }

    #[test]
    fn missing_file_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::remove_file(dir.path().join("sales.csv")).unwrap();

        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::MissingFile { ref relation, .. } if relation == "sales"));
    }

    #[test]
    fn missing_required_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(dir.path().join("vendor_invoice.csv"), "VendorNumber,PONumber\n105,8124\n").unwrap();

        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "Freight"));
    }

    #[test]
    fn empty_numeric_cells_load_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(
            dir.path().join("purchases.csv"),
            "VendorNumber,VendorName,Brand,Description,PurchasePrice,Quantity,Dollars\n\
             105,ALTAMAR BRANDS LLC,8412,Tequila Ocho Plata Fresno,35.71,6,\n\
             105,ALTAMAR BRANDS LLC,8412,Tequila Ocho Plata Fresno,,,142.84\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("sales.csv"),
            "VendorNo,Brand,SalesQuantity,SalesDollars,SalesPrice,ExciseTax\n105,8412, ,,49.99,\n",
        )
        .unwrap();

        let snapshot = load_snapshot(dir.path()).unwrap();
        assert_eq!(snapshot.purchases[0].quantity, Some(6));
        assert_eq!(snapshot.purchases[0].dollars, None);
        assert_eq!(snapshot.purchases[1].purchase_price, None);
        assert_eq!(snapshot.purchases[1].quantity, None);
        assert_eq!(snapshot.sales[0].sales_quantity, None);
        assert_eq!(snapshot.sales[0].sales_dollars, None);
        assert_eq!(snapshot.sales[0].sales_price, Some(49.99));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(
            dir.path().join("vendor_invoice.csv"),
            "VendorNumber,PONumber,Freight\n105,8124,1.57\n105,8125,NaN\n",
        )
        .unwrap();

        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::NonFinite { column: "Freight", line: 3, .. }));

        fs::write(
            dir.path().join("vendor_invoice.csv"),
            "VendorNumber,PONumber,Freight\n105,8124,1.57\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("purchases.csv"),
            "VendorNumber,VendorName,Brand,Description,PurchasePrice,Quantity,Dollars\n\
             105,ALTAMAR BRANDS LLC,8412,Tequila Ocho Plata Fresno,35.71,6,-inf\n",
        )
        .unwrap();
        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::NonFinite { column: "Dollars", line: 2, .. }));
    }

    #[test]
    fn unparsable_field_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(
            dir.path().join("sales.csv"),
            "VendorNo,Brand,SalesQuantity,SalesDollars,SalesPrice,ExciseTax\n105,8412,two,99.98,49.99,0.79\n",
        )
        .unwrap();

        let err = load_snapshot(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::Malformed { .. }));
    }
}
