use crate::classify::RegionValue;
use crate::config::DataConfig;
use crate::error::{MapError, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// A single parsed field after type inference
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Infer a field's type: empty is null, numeric-looking text is a number
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Cell::Null;
        }
        match raw {
            "true" | "TRUE" | "True" => return Cell::Bool(true),
            "false" | "FALSE" | "False" => return Cell::Bool(false),
            _ => {}
        }
        if looks_numeric(raw) {
            if let Ok(n) = raw.parse::<f64>() {
                return Cell::Number(n);
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used as a join key; numbers print without a trailing `.0`
    pub fn as_key(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Null => None,
        }
    }
}

/// Decimal numbers with optional sign, fraction and exponent.
/// Rejects `inf`, `NaN` and hex, which `f64::from_str` would otherwise take.
fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(i) => (&body[..i], Some(&body[i + 1..])),
        None => (body, None),
    };
    let mut parts = mantissa.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    let digits_ok = (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit());
    let exp_ok = exponent.map_or(true, |e| {
        let e = e.strip_prefix(['-', '+']).unwrap_or(e);
        !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit())
    });
    digits_ok && exp_ok
}

/// How many rows the required-column check inspects
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Only the first row
    #[default]
    FirstRow,
    AllRows,
}

/// Header plus rows of inferred cells
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Field of `row` under column `name`; absent when the row is short
    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        let col = self.column(name)?;
        self.rows.get(row)?.get(col)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project rows onto (name, value) pairs; rows without a name are dropped
    pub fn region_values(&self, name_column: &str, value_column: &str) -> Vec<RegionValue> {
        let (Some(name_col), value_col) = (self.column(name_column), self.column(value_column)) else {
            return Vec::new();
        };

        self.rows
            .iter()
            .filter_map(|row| {
                let name = row.get(name_col)?.as_key()?;
                let total = value_col.and_then(|c| row.get(c)).and_then(Cell::as_number);
                Some(RegionValue { name, total })
            })
            .collect()
    }
}

/// Pick the delimiter that occurs most in the header line
pub fn detect_delimiter(header_line: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
    CANDIDATES
        .iter()
        .copied()
        .max_by_key(|&d| (header_line.bytes().filter(|&b| b == d).count(), d == b','))
        .unwrap_or(b',')
}

/// Parse delimited text with a header row and per-field type inference
pub fn parse_table<R: Read>(mut reader: R) -> Result<Dataset> {
    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(|e| MapError::Decode {
        what: "delimited file",
        reason: e.to_string(),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let delimiter = detect_delimiter(text.lines().next().unwrap_or(""));
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(Cell::infer).collect());
    }

    tracing::debug!(
        rows = rows.len(),
        columns = headers.len(),
        delimiter = %(delimiter as char).escape_default(),
        "parsed delimited file"
    );

    Ok(Dataset { headers, rows })
}

/// Require `columns` to be present and non-null on the rows `mode` selects
pub fn validate_columns(dataset: &Dataset, columns: &[&str], mode: ValidationMode) -> Result<()> {
    if dataset.is_empty() {
        return Err(MapError::EmptyDataset);
    }

    let checked = match mode {
        ValidationMode::FirstRow => 1,
        ValidationMode::AllRows => dataset.len(),
    };

    for row in 0..checked {
        for &column in columns {
            let present = dataset.get(row, column).is_some_and(|c| !c.is_null());
            if !present {
                tracing::warn!(row, column, "required column missing");
                return Err(MapError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Read, parse and validate a tabular file into region values
pub fn load_table(path: &Path, config: &DataConfig) -> Result<Vec<RegionValue>> {
    let file = std::fs::File::open(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = parse_table(file)?;
    validate_columns(
        &dataset,
        &[config.value_column.as_str(), config.name_column.as_str()],
        config.validation,
    )?;
    Ok(dataset.region_values(&config.name_column, &config.value_column))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Dataset {
        parse_table(s.as_bytes()).unwrap()
    }

    #[test]
    fn test_type_inference() {
        assert_eq!(Cell::infer("42"), Cell::Number(42.0));
        assert_eq!(Cell::infer("-3.5e2"), Cell::Number(-350.0));
        assert_eq!(Cell::infer(".5"), Cell::Number(0.5));
        assert_eq!(Cell::infer(""), Cell::Null);
        assert_eq!(Cell::infer("true"), Cell::Bool(true));
        assert_eq!(Cell::infer("NaN"), Cell::Text("NaN".to_string()));
        assert_eq!(Cell::infer("inf"), Cell::Text("inf".to_string()));
        assert_eq!(Cell::infer("12abc"), Cell::Text("12abc".to_string()));
        assert_eq!(Cell::infer("1e"), Cell::Text("1e".to_string()));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("Canton,Total"), b',');
        assert_eq!(detect_delimiter("Canton;Total;Year"), b';');
        assert_eq!(detect_delimiter("Canton\tTotal"), b'\t');
        assert_eq!(detect_delimiter("Canton"), b',');
    }

    #[test]
    fn test_parse_and_project() {
        let ds = parse("Canton;Total\nZürich;1520\nBern;\n");
        assert_eq!(ds.headers, vec!["Canton", "Total"]);
        let values = ds.region_values("Canton", "Total");
        assert_eq!(values[0], RegionValue::new("Zürich", Some(1520.0)));
        assert_eq!(values[1], RegionValue::new("Bern", None));
    }

    #[test]
    fn test_first_row_validation() {
        let ds = parse("Canton,Total\nA,5\nB,\n");
        assert!(validate_columns(&ds, &["Total", "Canton"], ValidationMode::FirstRow).is_ok());
        // Second row has a null Total, only caught when every row is checked
        let err = validate_columns(&ds, &["Total", "Canton"], ValidationMode::AllRows).unwrap_err();
        assert!(matches!(err, MapError::MissingColumn { column } if column == "Total"));
    }

    #[test]
    fn test_missing_column() {
        let ds = parse("Region,Total\nA,5\n");
        let err = validate_columns(&ds, &["Total", "Canton"], ValidationMode::FirstRow).unwrap_err();
        assert!(matches!(err, MapError::MissingColumn { column } if column == "Canton"));
    }

    #[test]
    fn test_null_on_first_row_fails() {
        let ds = parse("Canton,Total\nA,\nB,7\n");
        assert!(validate_columns(&ds, &["Total", "Canton"], ValidationMode::FirstRow).is_err());
    }

    #[test]
    fn test_empty_dataset_fails_validation() {
        let ds = parse("Canton,Total\n");
        assert!(matches!(
            validate_columns(&ds, &["Total"], ValidationMode::FirstRow),
            Err(MapError::EmptyDataset)
        ));
    }

    #[test]
    fn test_short_rows_tolerated() {
        let ds = parse("Canton,Total,Year\nA,5\nB,6,2020\n");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "Year"), None);
        assert_eq!(ds.get(1, "Year"), Some(&Cell::Number(2020.0)));
    }

    #[test]
    fn test_numeric_names_become_keys() {
        let ds = parse("Canton,Total\n1,5\n");
        assert_eq!(ds.region_values("Canton", "Total")[0].name, "1");
    }
}
