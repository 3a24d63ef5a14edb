use crate::error::{Error, Result};
use serde::Serializer;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::error;

/// Open `path` for reading, stdin if it is absent or `-`
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("Cannot open {}: {e}", path.display()),
                ))
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin())),
    }
}

/// Open `path` for writing, stdout if it is absent or `-`
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Box::new(BufWriter::new(File::create(path)?)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

/// Fail if any of `columns` is missing from the CSV header
pub fn require_columns(headers: &csv::StringRecord, columns: &[&str]) -> Result<()> {
    for column in columns {
        if !headers.iter().any(|h| h == *column) {
            error!("Input is missing column `{}`", column);
            return Err(Error::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Boolean as written by the rest of the pipeline
pub fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Serialize a boolean column as `True` or `False`
pub fn serialize_bool<S>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(python_bool(*value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns() {
        let headers = csv::StringRecord::from(vec!["full_name", "commit_count"]);
        assert!(require_columns(&headers, &["full_name"]).is_ok());

        match require_columns(&headers, &["full_name", "packages"]) {
            Err(Error::MissingColumn(column)) => assert_eq!(column, "packages"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_serialize_bool_in_csv() {
        #[derive(serde::Serialize)]
        struct Row {
            #[serde(serialize_with = "serialize_bool")]
            flag: bool,
        }

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.serialize(Row { flag: true }).unwrap();
        writer.serialize(Row { flag: false }).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(output, "flag\nTrue\nFalse\n");
    }

    #[test]
    fn test_open_output_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        {
            let mut output = open_output(Some(&path)).unwrap();
            output.write_all(b"a,b\n").unwrap();
        }
        let mut content = String::new();
        open_input(Some(&path))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "a,b\n");
    }
}
