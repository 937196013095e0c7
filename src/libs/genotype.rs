use crate::{parse, resolve, Catalog, GenomeResult, Thresholds, BLAST_OUTFMT};
use cmd_lib::spawn_with_output;
use std::path::{Path, PathBuf};

pub const DEFAULT_THREADS: usize = 8;
/// blastn's own default; raised to the allele count of larger catalogs.
pub const DEFAULT_MAX_TARGET_SEQS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum GenotypeError {
    #[error("{0} does not look like a FASTA file")]
    NotFasta(String),
    #[error("{program} failed on {query}: {source}")]
    Aligner {
        program: String,
        query: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a single genome needs besides the catalog.
#[derive(Debug, Clone)]
pub struct GenotypeOptions {
    /// Reference FASTA, indexed with `makeblastdb` under the same name.
    pub db: PathBuf,
    pub thresholds: Thresholds,
    /// `-num_threads` of each aligner process.
    pub threads: usize,
    /// Aligner executable.
    pub blastn: String,
    /// Lower bound of `-max_target_seqs`. [`type_genome`] never passes less
    /// than the catalog's allele count, so no allele of a locus is cut off.
    pub max_target_seqs: usize,
}

impl GenotypeOptions {
    pub fn new<P: AsRef<Path>>(db: P) -> Self {
        Self {
            db: db.as_ref().to_path_buf(),
            thresholds: Thresholds::default(),
            threads: DEFAULT_THREADS,
            blastn: "blastn".to_string(),
            max_target_seqs: DEFAULT_MAX_TARGET_SEQS,
        }
    }
}

/// Runs the aligner on one assembly and returns its tabular report.
///
/// A non-zero exit and a report that is not valid UTF-8 are both errors.
pub fn run_blastn(
    query: &Path,
    opts: &GenotypeOptions,
    max_target_seqs: usize,
) -> Result<String, GenotypeError> {
    let blastn = &opts.blastn;
    let query_arg = query.display().to_string();
    let db_arg = opts.db.display().to_string();
    let outfmt = BLAST_OUTFMT;
    let threads = opts.threads.max(1);
    let max_target_seqs = max_target_seqs.max(1);

    let aligner_error = |source: std::io::Error| GenotypeError::Aligner {
        program: blastn.to_string(),
        query: query_arg.clone(),
        source,
    };

    log::debug!(
        "{} -query {} -db {} -num_threads {} -max_target_seqs {}",
        blastn,
        query_arg,
        db_arg,
        threads,
        max_target_seqs
    );
    let mut raw = vec![];
    spawn_with_output!(
        ${blastn} -query ${query_arg} -db ${db_arg} -outfmt ${outfmt}
            -num_threads ${threads} -max_target_seqs ${max_target_seqs}
    )
    .and_then(|mut proc| proc.wait_with_raw_output(&mut raw))
    .map_err(aligner_error)?;

    String::from_utf8(raw)
        .map_err(|e| aligner_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Parser and resolver over an already captured report.
pub fn genotype_report(
    report: &str,
    thresholds: &Thresholds,
    catalog: &Catalog,
) -> GenomeResult {
    let hits = parse(report);
    log::debug!("{} alignment records", hits.len());
    resolve(&hits, thresholds, catalog)
}

/// Types one assembly against the reference database.
///
/// Errors are confined to this genome; callers decide whether to go on.
pub fn type_genome<P: AsRef<Path>>(
    assembly: P,
    catalog: &Catalog,
    opts: &GenotypeOptions,
) -> Result<GenomeResult, GenotypeError> {
    let assembly = assembly.as_ref();
    if !crate::is_fasta(assembly) {
        return Err(GenotypeError::NotFasta(assembly.display().to_string()));
    }

    let max_target_seqs = opts.max_target_seqs.max(catalog.num_alleles());
    let report = run_blastn(assembly, opts, max_target_seqs)?;
    Ok(genotype_report(&report, &opts.thresholds, catalog))
}
