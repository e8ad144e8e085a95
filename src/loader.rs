use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::PTError;
use crate::table::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

/// Column of a loaded file, values already converted.
struct LoadedColumn {
    name: String,
    numeric: bool,
    values: Vec<Value>,
}

/// Rows read from a data file.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub name: String,
    pub columns: Vec<String>,
    /// Names of the columns holding numbers.
    pub numeric_columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl LoadedTable {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }
}

pub fn load_data_file(path: PathBuf) -> Result<LoadedTable, PTError> {
    let file_info = get_file_info(path)?;
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted on its own rayon worker.
    let start_time = Instant::now();
    let df = frame.collect()?;
    let columns: Result<Vec<LoadedColumn>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let nrows = df.height();
    let mut rows = vec![Row::new(); nrows];
    for column in columns.iter() {
        for (row, value) in rows.iter_mut().zip(column.values.iter()) {
            row.set(column.name.clone(), value.clone());
        }
    }

    info!(
        "Loading {} rows from {} ({} bytes) took {}ms",
        nrows,
        file_info.path.display(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );

    Ok(LoadedTable {
        name: file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string(),
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        numeric_columns: columns
            .iter()
            .filter(|c| c.numeric)
            .map(|c| c.name.clone())
            .collect(),
        rows,
    })
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<LoadedColumn, PolarsError> {
    let column = df.column(col_name)?;
    let dtype = column.dtype().clone();
    debug!("Column \"{col_name}\": {dtype:?}");

    let values: Vec<Value> = if is_numeric_type(&dtype) {
        let col = column.cast(&DataType::Float64)?;
        col.as_materialized_series()
            .f64()?
            .into_iter()
            .map(Value::from)
            .collect()
    } else if dtype == DataType::Boolean {
        column
            .as_materialized_series()
            .bool()?
            .into_iter()
            .map(Value::from)
            .collect()
    } else {
        let col = column.cast(&DataType::String)?;
        col.str()?
            .into_iter()
            .map(|v| match v {
                Some(s) => Value::from(s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
                None => Value::Null,
            })
            .collect()
    };

    Ok(LoadedColumn {
        name: col_name.to_string(),
        numeric: is_numeric_type(&dtype),
        values,
    })
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn detect_file_type(path: &Path) -> Result<FileType, PTError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(PTError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, PTError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PTError::FileNotFound,
        ErrorKind::PermissionDenied => PTError::PermissionDenied,
        _ => PTError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(PTError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
