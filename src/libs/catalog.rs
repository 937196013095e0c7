use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref ALLELE_NUMBER: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed reference header `{header}`: expected <locus>{delimiter}<allele number>")]
    MalformedReference { header: String, delimiter: String },
    #[error("allele `{0}` appears more than once in the reference database")]
    DuplicateAllele(String),
    #[error("reference database {0} contains no sequences")]
    Empty(String),
    #[error("could not read reference database {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One reference sequence: a numbered variant of a locus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allele {
    pub locus: String,
    pub number: String,
}

impl Allele {
    /// Splits a header id at the last `delimiter`.
    ///
    /// ```
    /// use cpstype::Allele;
    /// let allele = Allele::parse("CAMP1067_12", "_").unwrap();
    /// assert_eq!(allele.locus, "CAMP1067");
    /// assert_eq!(allele.number, "12");
    ///
    /// // locus names may contain the delimiter themselves
    /// let allele = Allele::parse("HS_23_1", "_").unwrap();
    /// assert_eq!(allele.locus, "HS_23");
    ///
    /// assert!(Allele::parse("CAMP1067", "_").is_err());
    /// ```
    pub fn parse(id: &str, delimiter: &str) -> Result<Self, CatalogError> {
        let malformed = || CatalogError::MalformedReference {
            header: id.to_string(),
            delimiter: delimiter.to_string(),
        };

        if delimiter.is_empty() {
            return Err(malformed());
        }
        let (locus, number) = id.rsplit_once(delimiter).ok_or_else(malformed)?;
        if locus.is_empty() || !ALLELE_NUMBER.is_match(number) {
            return Err(malformed());
        }

        Ok(Allele {
            locus: locus.to_string(),
            number: number.to_string(),
        })
    }
}

/// Allele-to-locus membership of the reference database.
///
/// Built once per run and shared read-only. Loci keep the order in which they
/// first appear in the database, which is the column order of every report.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    alleles: IndexMap<String, Allele>,
    loci: IndexSet<String>,
}

impl Catalog {
    /// Builds a catalog from allele ids. Any malformed or repeated id fails the
    /// whole catalog.
    pub fn from_ids<I, S>(ids: I, delimiter: &str) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Catalog::default();
        for id in ids {
            let id = id.as_ref();
            let allele = Allele::parse(id, delimiter)?;
            catalog.loci.insert(allele.locus.clone());
            if catalog.alleles.insert(id.to_string(), allele).is_some() {
                return Err(CatalogError::DuplicateAllele(id.to_string()));
            }
        }

        Ok(catalog)
    }

    /// Reads every record header of a (possibly gzipped) FASTA file.
    pub fn from_fasta<P: AsRef<Path>>(path: P, delimiter: &str) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let io_err = |source: Box<dyn std::error::Error + Send + Sync>| CatalogError::Io {
            path: path.display().to_string(),
            source,
        };

        let reader = crate::reader(path).map_err(|e| io_err(e.into()))?;
        let mut fa_in = noodles_fasta::io::Reader::new(reader);

        let mut ids = vec![];
        for result in fa_in.records() {
            let record = result.map_err(|e| io_err(e.into()))?;
            let name = String::from_utf8(record.name().into()).map_err(|e| io_err(e.into()))?;
            ids.push(name);
        }

        if ids.is_empty() {
            return Err(CatalogError::Empty(path.display().to_string()));
        }
        Catalog::from_ids(ids, delimiter)
    }

    /// Locus of an allele id, `None` for ids the database does not contain.
    pub fn resolve_locus(&self, allele_id: &str) -> Option<&str> {
        self.alleles.get(allele_id).map(|a| a.locus.as_str())
    }

    pub fn allele(&self, allele_id: &str) -> Option<&Allele> {
        self.alleles.get(allele_id)
    }

    pub fn loci(&self) -> impl Iterator<Item = &str> + '_ {
        self.loci.iter().map(|s| s.as_str())
    }

    pub fn contains_locus(&self, locus: &str) -> bool {
        self.loci.contains(locus)
    }

    pub fn num_loci(&self) -> usize {
        self.loci.len()
    }

    pub fn num_alleles(&self) -> usize {
        self.alleles.len()
    }
}
