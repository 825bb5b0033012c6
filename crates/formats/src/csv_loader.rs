use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::records::{ConnectionRecord, EntityRecord, TransactionRecord};

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(f, "failed to open {}: {source}", path.display())
            }
            LoadError::Csv { path, source } => {
                write!(f, "failed to read CSV {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Csv { source, .. } => Some(source),
        }
    }
}

/// Reads every row of a headed CSV stream into `T`.
///
/// Rows that fail to deserialize are skipped with a warning; I/O failures and
/// an unreadable header abort the read.
pub fn read_records<T, R>(reader: R, label: &str) -> Result<Vec<T>, csv::Error>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    reader.headers()?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, row) in reader.deserialize::<T>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                skipped += 1;
                warn!(file = label, row = idx + 1, error = %e, "skipping malformed row");
            }
        }
    }

    info!(file = label, rows = records.len(), skipped, "loaded CSV");
    Ok(records)
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let file = File::open(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let label = path.display().to_string();
    read_records(file, &label).map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<EntityRecord>, LoadError> {
    load_file(path.as_ref())
}

pub fn load_connections(path: impl AsRef<Path>) -> Result<Vec<ConnectionRecord>, LoadError> {
    load_file(path.as_ref())
}

pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<TransactionRecord>, LoadError> {
    load_file(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::{LoadError, load_entities, read_records};
    use crate::records::{ConnectionRecord, EntityRecord, TransactionRecord};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(label: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("supply_globe_csv_{label}_{}.csv", std::process::id()));
        fs::write(&path, contents).expect("write temp csv");
        path
    }

    #[test]
    fn reads_entity_rows_with_optional_columns() {
        let csv = "id,type,name,country,lat,lon\n\
                   NYC, plant ,New York,US,40.7,-74.0\n\
                   LON,warehouse,London,UK,51.5,-0.13\n";
        let rows: Vec<EntityRecord> = read_records(csv.as_bytes(), "entities").expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, "plant");
        assert_eq!(rows[0].lat, "40.7");
        assert_eq!(rows[1].color, None);
        assert_eq!(rows[1].size, None);
    }

    #[test]
    fn connection_amount_is_optional() {
        let csv = "Flow_Id,Id_From,Id_To,step_type,amount\n\
                   f1,NYC,LON,supplier,12.5\n\
                   f2,LON,NYC,internal_1,\n";
        let rows: Vec<ConnectionRecord> =
            read_records(csv.as_bytes(), "connections").expect("read");
        assert_eq!(
            rows,
            vec![
                ConnectionRecord {
                    flow_id: "f1".into(),
                    id_from: "NYC".into(),
                    id_to: "LON".into(),
                    step_type: "supplier".into(),
                    amount: Some(12.5),
                },
                ConnectionRecord {
                    flow_id: "f2".into(),
                    id_from: "LON".into(),
                    id_to: "NYC".into(),
                    step_type: "internal_1".into(),
                    amount: None,
                },
            ]
        );
    }

    #[test]
    fn bad_transaction_numbers_become_zero() {
        let csv = "Product_Key,Product_Name,Global_Business_Function,Category,Packaging,\
                   NART_Packaging,Flow_Id_Supplier,Flow_Id_internal,Flow_Id_Customer,Order_qty,\
                   Actual_qty,Order_value_COM,Actual_value_COM,Order_value_Sell,Actual_value_Sell\n\
                   P1,Cream,Skin,Care,Jar,J1,S1-P1,P1-W1,W1-C1,10,n/a,1,2,3,\n";
        let rows: Vec<TransactionRecord> =
            read_records(csv.as_bytes(), "transactions").expect("read");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].order_qty, 10.0);
        assert_eq!(rows[0].actual_qty, 0.0);
        assert_eq!(rows[0].order_value_sell, 3.0);
        assert_eq!(rows[0].actual_value_sell, 0.0);
        assert_eq!(rows[0].flow_id_customer, "W1-C1");
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let csv = "Flow_Id,Id_From,Id_To,step_type,amount\n\
                   f1,NYC,LON,supplier,lots\n\
                   f2,LON,NYC,supplier,3\n";
        let rows: Vec<ConnectionRecord> =
            read_records(csv.as_bytes(), "connections").expect("read");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].flow_id, "f2");
    }

    #[test]
    fn loads_from_disk_and_reports_missing_files() {
        let path = temp_file("entities", "id,type,name,country,lat,lon\nA,t,Alpha,FR,1,2\n");
        let rows = load_entities(&path).expect("load");
        assert_eq!(rows.len(), 1);
        let _ = fs::remove_file(&path);

        let err = load_entities(path.with_extension("missing")).expect_err("missing file");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
