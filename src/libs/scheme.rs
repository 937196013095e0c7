use calamine::Reader;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

pub const LOCUS_COLUMN: &str = "Loci";
pub const ALIAS_COLUMN: &str = "Gene/Aliases";

#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("could not open workbook {path}: {source}")]
    Workbook {
        path: String,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no worksheet")]
    NoWorksheet(String),
    #[error("{path} has no `{column}` column in its header")]
    MissingColumn { path: String, column: String },
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Locus naming scheme: display labels of the form `locus(alias)`.
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    alias_of: HashMap<String, String>,
}

impl Scheme {
    /// Every locus keeps its raw id.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut scheme = Self::default();
        for (locus, alias) in pairs {
            scheme.insert(locus.into(), alias.into());
        }
        scheme
    }

    /// Loads a spreadsheet (`.xlsx`, `.xls`, `.ods`) or a tab-separated file.
    ///
    /// Either way the header row must name the `Loci` and `Gene/Aliases` columns.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SchemeError> {
        let path = path.as_ref();
        let is_sheet = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "xlsm" | "xls" | "ods"))
            .unwrap_or(false);

        if is_sheet {
            Self::from_workbook(path)
        } else {
            Self::from_tsv(path)
        }
    }

    fn from_workbook(path: &Path) -> Result<Self, SchemeError> {
        let display = path.display().to_string();
        let mut workbook =
            calamine::open_workbook_auto(path).map_err(|source| SchemeError::Workbook {
                path: display.clone(),
                source,
            })?;
        let sheet = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SchemeError::NoWorksheet(display.clone()))?
            .map_err(|source| SchemeError::Workbook {
                path: display.clone(),
                source,
            })?;

        let mut rows = sheet
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let header = rows.next().unwrap_or_default();
        let (locus_idx, alias_idx) = Self::column_indices(&header, &display)?;

        let mut scheme = Self::default();
        for row in rows {
            scheme.insert_row(&row, locus_idx, alias_idx);
        }
        Ok(scheme)
    }

    fn from_tsv(path: &Path) -> Result<Self, SchemeError> {
        let display = path.display().to_string();
        let io_err = |source: Box<dyn std::error::Error + Send + Sync>| SchemeError::Io {
            path: display.clone(),
            source,
        };

        let reader = crate::reader(path).map_err(|e| io_err(e.into()))?;
        let mut lines = reader.lines();
        let header: Vec<String> = match lines.next() {
            Some(line) => line
                .map_err(|e| io_err(e.into()))?
                .split('\t')
                .map(|s| s.to_string())
                .collect(),
            None => vec![],
        };
        let (locus_idx, alias_idx) = Self::column_indices(&header, &display)?;

        let mut scheme = Self::default();
        for line in lines {
            let line = line.map_err(|e| io_err(e.into()))?;
            let row: Vec<String> = line.split('\t').map(|s| s.to_string()).collect();
            scheme.insert_row(&row, locus_idx, alias_idx);
        }
        Ok(scheme)
    }

    fn column_indices(header: &[String], path: &str) -> Result<(usize, usize), SchemeError> {
        let find = |column: &str| {
            header
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| SchemeError::MissingColumn {
                    path: path.to_string(),
                    column: column.to_string(),
                })
        };
        Ok((find(LOCUS_COLUMN)?, find(ALIAS_COLUMN)?))
    }

    fn insert_row(&mut self, row: &[String], locus_idx: usize, alias_idx: usize) {
        let locus = row.get(locus_idx).map(|s| s.trim()).unwrap_or("");
        let alias = row.get(alias_idx).map(|s| s.trim()).unwrap_or("");
        self.insert(locus.to_string(), alias.to_string());
    }

    fn insert(&mut self, locus: String, alias: String) {
        if locus.is_empty() || alias.is_empty() {
            return;
        }
        self.alias_of.insert(locus, alias);
    }

    pub fn alias(&self, locus: &str) -> Option<&str> {
        self.alias_of.get(locus).map(|s| s.as_str())
    }

    /// `CAMP1067` becomes `CAMP1067(waaF)`; unknown loci keep the raw id.
    ///
    /// ```
    /// let scheme = cpstype::Scheme::from_pairs([("CAMP1067", "waaF")]);
    /// assert_eq!(scheme.label("CAMP1067"), "CAMP1067(waaF)");
    /// assert_eq!(scheme.label("CAMP1050"), "CAMP1050");
    /// ```
    pub fn label(&self, locus: &str) -> String {
        match self.alias(locus) {
            Some(alias) => format!("{}({})", locus, alias),
            None => locus.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.alias_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alias_of.is_empty()
    }
}
