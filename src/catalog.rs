//! Activity catalog loaded from a CSV table.
//!
//! Rows keep every column of the source so callers can pass them through
//! untouched. Only the `name` column is required; it is the text that gets
//! embedded for semantic search.

use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Column holding the text used for embeddings.
pub const NAME_COLUMN: &str = "name";

/// Cell contents read as missing values, in addition to the empty cell.
/// Matches the default NA markers of pandas' `read_csv`.
const NULL_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_null(value: &str) -> bool {
    value.is_empty() || NULL_MARKERS.contains(&value)
}

/// Where the catalog is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Path(PathBuf),
    Url(url::Url),
}

impl DataSource {
    /// Interpret a configured location. `http(s)://` URLs are fetched over
    /// the network, everything else is treated as a local path.
    pub fn parse(location: &str) -> Self {
        match url::Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DataSource::Url(url),
            _ => DataSource::Path(PathBuf::from(location)),
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Path(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("dataset not found at {0}")]
    NotFound(String),

    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to fetch dataset: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed dataset: {0}")]
    Malformed(#[from] csv::Error),

    #[error("dataset has no 'name' column")]
    MissingNameColumn,
}

/// Out-of-range row lookup. Indicates a caller bug, never retryable.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("row {index} out of range for catalog of {len} rows")]
pub struct RowOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// One catalog row: an ordered mapping from column name to nullable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    row_index: usize,
    columns: Arc<[String]>,
    name_column: usize,
    values: Vec<Option<String>>,
}

impl Item {
    /// Zero-based position in the catalog.
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    /// Activity name, `""` when the cell is empty.
    pub fn name(&self) -> &str {
        self.values[self.name_column].as_deref().unwrap_or("")
    }

    /// Value of `column`, `None` when the column is unknown or the cell is empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        let pos = self.columns.iter().position(|c| c == column)?;
        self.values[pos].as_deref()
    }

    /// Iterate `(column, value)` pairs in source column order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.fields() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Immutable, in-memory table of activities.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    columns: Arc<[String]>,
    items: Vec<Item>,
}

impl ItemCatalog {
    /// Load the catalog from a local file or a URL.
    pub fn load(source: &DataSource) -> Result<Self, DataSourceError> {
        let now = Instant::now();

        let catalog = match source {
            DataSource::Path(path) => {
                let file = std::fs::File::open(path).map_err(|err| match err.kind() {
                    ErrorKind::NotFound => DataSourceError::NotFound(path.display().to_string()),
                    _ => DataSourceError::Io(err),
                })?;
                Self::from_reader(file)?
            }
            DataSource::Url(url) => {
                let response = reqwest::blocking::get(url.clone())?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(DataSourceError::NotFound(url.to_string()));
                }
                let body = response.error_for_status()?.bytes()?;
                Self::from_reader(body.as_ref())?
            }
        };

        log::debug!(
            "took {}ms to load {} rows from {source}",
            now.elapsed().as_micros() as f64 / 1000.0,
            catalog.row_count()
        );

        Ok(catalog)
    }

    /// Parse CSV with a header row. Empty cells and NA markers such as `NaN`
    /// or `null` are stored as nulls.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataSourceError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let columns: Arc<[String]> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let name_column = columns
            .iter()
            .position(|c| c == NAME_COLUMN)
            .ok_or(DataSourceError::MissingNameColumn)?;

        let mut items = vec![];
        for (row_index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let values = record
                .iter()
                .map(|value| (!is_null(value)).then(|| value.to_string()))
                .collect();

            items.push(Item {
                row_index,
                columns: columns.clone(),
                name_column,
                values,
            });
        }

        Ok(Self { columns, items })
    }

    pub fn row_at(&self, index: usize) -> Result<&Item, RowOutOfRange> {
        self.items.get(index).ok_or(RowOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Texts to embed, one per row in catalog order.
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    /// Serve a single canned HTTP response on localhost.
    fn serve_once(status: &str, body: &str) -> DataSource {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = vec![];
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
        });

        DataSource::parse(&format!("http://{addr}/activities.csv"))
    }

    const SAMPLE: &str = "name,state,indoor_or_outdoor\n\
                          City Zoo,CA,outdoor\n\
                          ,NY,indoor\n\
                          Kids Museum,TX,\n";

    #[test]
    fn test_from_reader_keeps_columns_in_order() {
        let catalog = ItemCatalog::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(catalog.row_count(), 3);
        assert_eq!(catalog.columns(), ["name", "state", "indoor_or_outdoor"]);

        let zoo = catalog.row_at(0).unwrap();
        let fields: Vec<_> = zoo.fields().collect();
        assert_eq!(
            fields,
            vec![
                ("name", Some("City Zoo")),
                ("state", Some("CA")),
                ("indoor_or_outdoor", Some("outdoor")),
            ]
        );
    }

    #[test]
    fn test_null_name_becomes_empty_string() {
        let catalog = ItemCatalog::from_reader(SAMPLE.as_bytes()).unwrap();

        let row = catalog.row_at(1).unwrap();
        assert_eq!(row.name(), "");
        assert_eq!(row.get("name"), None);
        assert_eq!(row.get("state"), Some("NY"));
        assert_eq!(catalog.names(), vec!["City Zoo", "", "Kids Museum"]);
    }

    #[test]
    fn test_row_indices_follow_catalog_order() {
        let catalog = ItemCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let indices: Vec<_> = catalog.iter().map(Item::row_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_row_at_out_of_range() {
        let catalog = ItemCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            catalog.row_at(3).unwrap_err(),
            RowOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_header_only_is_empty_catalog() {
        let catalog = ItemCatalog::from_reader("name,state\n".as_bytes()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.row_count(), 0);
    }

    #[test]
    fn test_missing_name_column() {
        let result = ItemCatalog::from_reader("title,state\nZoo,CA\n".as_bytes());
        assert!(matches!(result, Err(DataSourceError::MissingNameColumn)));
    }

    #[test]
    fn test_empty_input_has_no_name_column() {
        let result = ItemCatalog::from_reader("".as_bytes());
        assert!(matches!(result, Err(DataSourceError::MissingNameColumn)));
    }

    #[test]
    fn test_ragged_rows_are_malformed() {
        let result = ItemCatalog::from_reader("name,state\nZoo,CA,extra\n".as_bytes());
        assert!(matches!(result, Err(DataSourceError::Malformed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let source = DataSource::Path(tmp.path().join("missing.csv"));
        assert!(matches!(
            ItemCatalog::load(&source),
            Err(DataSourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("activities.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = ItemCatalog::load(&DataSource::Path(path)).unwrap();
        assert_eq!(catalog.row_count(), 3);
    }

    #[test]
    fn test_na_markers_are_null() {
        let csv = "name,state\nNaN,CA\nnull,NY\nN/A,TX\nNone,\nNAN,WA\n";
        let catalog = ItemCatalog::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(catalog.names(), vec!["", "", "", "", "NAN"]);
        assert_eq!(catalog.row_at(0).unwrap().get("name"), None);
        assert_eq!(catalog.row_at(3).unwrap().get("state"), None);
    }

    #[test]
    fn test_load_from_url() {
        let source = serve_once("200 OK", SAMPLE);
        let catalog = ItemCatalog::load(&source).unwrap();
        assert_eq!(catalog.row_count(), 3);
        assert_eq!(catalog.row_at(0).unwrap().name(), "City Zoo");
    }

    #[test]
    fn test_load_url_not_found() {
        let source = serve_once("404 Not Found", "");
        assert!(matches!(
            ItemCatalog::load(&source),
            Err(DataSourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_url_server_error() {
        let source = serve_once("500 Internal Server Error", "");
        assert!(matches!(
            ItemCatalog::load(&source),
            Err(DataSourceError::Http(_))
        ));
    }

    #[test]
    fn test_data_source_parse() {
        assert!(matches!(
            DataSource::parse("https://example.com/data.csv"),
            DataSource::Url(_)
        ));
        assert_eq!(
            DataSource::parse("data/processed/family_friendly_dataset.csv"),
            DataSource::Path(PathBuf::from("data/processed/family_friendly_dataset.csv"))
        );
        assert!(matches!(
            DataSource::parse("C:\\data\\activities.csv"),
            DataSource::Path(_)
        ));
    }

    #[test]
    fn test_item_serializes_as_ordered_object() {
        let catalog = ItemCatalog::from_reader(SAMPLE.as_bytes()).unwrap();
        let json = serde_json::to_string(catalog.row_at(2).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Kids Museum","state":"TX","indoor_or_outdoor":null}"#
        );
    }
}
