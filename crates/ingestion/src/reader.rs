use crate::error::IngestError;
use core_types::{PurchasePriceRecord, PurchaseRecord, Relation, SalesRecord, VendorInvoiceRecord};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Columns a file must carry to be loaded as `relation`. Other columns are
/// allowed and ignored.
pub fn required_columns(relation: Relation) -> &'static [&'static str] {
    match relation {
        Relation::Purchases => &[
            "VendorNumber",
            "VendorName",
            "Brand",
            "Description",
            "PurchasePrice",
            "Quantity",
            "Dollars",
        ],
        Relation::PurchasePrices => &["VendorNumber", "Brand", "Price", "Volume"],
        Relation::VendorInvoice => &["VendorNumber", "PONumber", "Freight"],
        Relation::Sales => &[
            "VendorNo",
            "Brand",
            "SalesQuantity",
            "SalesDollars",
            "SalesPrice",
            "ExciseTax",
        ],
    }
}

/// The floating-point fields of a raw record, by source column name.
///
/// `f64` parsing accepts `inf` and `NaN`; the reader rejects such values
/// through this list.
pub trait NumericFields {
    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)>;
}

impl NumericFields for PurchaseRecord {
    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("PurchasePrice", self.purchase_price), ("Dollars", self.dollars)]
    }
}

impl NumericFields for PurchasePriceRecord {
    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("Price", self.price)]
    }
}

impl NumericFields for VendorInvoiceRecord {
    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("Freight", self.freight)]
    }
}

impl NumericFields for SalesRecord {
    fn numeric_fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("SalesDollars", self.sales_dollars),
            ("SalesPrice", self.sales_price),
            ("ExciseTax", self.excise_tax),
        ]
    }
}

/// Reads every row of the delimited file at `path` as a `T`.
///
/// Fields are trimmed; empty fields deserialize to `None` for optional values.
/// The whole file is read before returning, so the first bad row aborts the
/// load.
pub fn read_records<T: DeserializeOwned + NumericFields>(
    path: &Path,
    relation: Relation,
) -> Result<Vec<T>, IngestError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IngestError::MissingFile {
            relation: relation.to_string(),
            path: path.to_path_buf(),
        },
        _ => IngestError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| IngestError::Malformed {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    for column in required_columns(relation) {
        if !headers.iter().any(|h| h == *column) {
            return Err(IngestError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let malformed = |source| IngestError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        let row: T = record.deserialize(Some(&headers)).map_err(malformed)?;

        if let Some((column, value)) = row
            .numeric_fields()
            .into_iter()
            .find_map(|(column, value)| value.filter(|v| !v.is_finite()).map(|v| (column, v)))
        {
            return Err(IngestError::NonFinite {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |p| p.line()),
                column,
                value,
            });
        }
        rows.push(row);
    }
    Ok(rows)
}
