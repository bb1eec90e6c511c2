//! Raw export reader with encoding and delimiter auto-detection.
//!
//! Resolves a source (local path or URL), decodes its bytes and splits it
//! into headerless positional [`RawRow`]s. No statistics-specific logic here.

use csv::ReaderBuilder;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{SourceError, SourceResult};
use crate::models::RawRow;

/// Where the raw table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    /// `http://` and `https://` inputs are URLs, everything else is a path.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input.to_string())
        } else {
            Self::Path(PathBuf::from(input))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

/// Parsed raw table with detection metadata.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Rows in source order
    pub rows: Vec<RawRow>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Read the source bytes, downloading when the source is a URL.
pub async fn fetch_source(source: &Source) -> SourceResult<Vec<u8>> {
    match source {
        Source::Path(path) => read_file(path).await,
        Source::Url(url) => download(url).await,
    }
}

async fn read_file(path: &Path) -> SourceResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

async fn download(url: &str) -> SourceResult<Vec<u8>> {
    let http_err = |message: String| SourceError::Http {
        url: url.to_string(),
        message,
    };

    let response = reqwest::get(url)
        .await
        .map_err(|e| http_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(http_err(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| http_err(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> SourceResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                SourceError::Encoding(format!("unsupported encoding '{}'", other))
            })?;
            codec.decode(bytes).0.into_owned()
        }
    };
    Ok(decoded)
}

/// Separators considered by [`detect_delimiter`], the export's native one first.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Lines sampled for delimiter detection.
const DELIMITER_SAMPLE_LINES: usize = 50;

/// Lines that must split into three or more cells before a non-comma
/// separator is preferred.
const MIN_WIDE_LINES: usize = 2;

/// Detect the delimiter over a sample of non-empty lines.
///
/// A line counts for a separator when it splits into at least three cells.
/// Another separator replaces `,` only when it yields such lines more often
/// than `,` does, on at least [`MIN_WIDE_LINES`] lines. A title line with a
/// stray `;` therefore does not change the delimiter.
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();
    let wide_lines = |sep: char| sample.iter().filter(|l| l.matches(sep).count() >= 2).count();

    let comma = wide_lines(',');
    DELIMITERS[1..]
        .iter()
        .map(|&sep| (sep, wide_lines(sep)))
        .filter(|&(_, n)| n >= MIN_WIDE_LINES && n > comma)
        .max_by_key(|&(_, n)| n)
        .map_or(',', |(sep, _)| sep)
}

/// Printable form of a delimiter (`\t` for tab).
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

/// Split decoded content into headerless raw rows.
///
/// Record widths may vary; quoted fields are honoured and fully empty
/// lines are skipped. A line of empty cells (`,,`) is kept as a blank row.
pub fn read_raw_rows(content: &str, delimiter: char) -> SourceResult<Vec<RawRow>> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| SourceError::Encoding(format!("non-ASCII delimiter '{}'", delimiter)))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawRow::from_cells(record.iter()));
    }

    if rows.is_empty() {
        return Err(SourceError::EmptySource);
    }
    Ok(rows)
}

/// Parse raw bytes with auto-detection of encoding and delimiter.
pub fn parse_source_bytes(bytes: &[u8]) -> SourceResult<RawTable> {
    parse_source_bytes_with(bytes, None)
}

/// Parse raw bytes, using `delimiter` when given instead of detecting it.
pub fn parse_source_bytes_with(bytes: &[u8], delimiter: Option<char>) -> SourceResult<RawTable> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let rows = read_raw_rows(&content, delimiter)?;

    Ok(RawTable {
        rows,
        encoding,
        delimiter,
    })
}
