use anyhow::Context;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Opens `input` for buffered reading; `.gz` files are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let reader = cpstype::reader("tests/cps/db.fa").unwrap();
/// let headers = reader
///     .lines()
///     .map(|l| l.unwrap())
///     .filter(|l| l.starts_with('>'))
///     .count();
/// assert_eq!(headers, 7);
/// ```
pub fn reader<P: AsRef<Path>>(input: P) -> anyhow::Result<Box<dyn BufRead>> {
    let path = input.as_ref();
    let file =
        File::open(path).with_context(|| format!("could not open {}", path.display()))?;

    let reader: Box<dyn BufRead> = if path.extension() == Some(std::ffi::OsStr::new("gz")) {
        Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

pub fn writer<P: AsRef<Path>>(output: P) -> anyhow::Result<Box<dyn Write>> {
    let path = output.as_ref();
    let writer: Box<dyn Write> = if path == Path::new("stdout") {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = File::create(path)
            .with_context(|| format!("could not create {}", path.display()))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Cheap format sniff: the first non-whitespace byte of a FASTA file is `>`.
///
/// Unreadable and empty files are not FASTA. Gzipped files are rejected too,
/// since the aligner cannot read them.
pub fn is_fasta<P: AsRef<Path>>(path: P) -> bool {
    let file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(_) => return false,
    };

    let mut buffer = [0u8; 512];
    let mut reader = BufReader::new(file);
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) | Err(_) => return false,
            Ok(n) => n,
        };
        if let Some(&b) = buffer[..n].iter().find(|b| !b.is_ascii_whitespace()) {
            return b == b'>';
        }
    }
}

/// File name without its last extension, used as the strain identifier.
///
/// ```
/// assert_eq!(cpstype::genome_id("data/GCF_000009085.fasta"), "GCF_000009085");
/// assert_eq!(cpstype::genome_id("81-176.contigs.fa"), "81-176.contigs");
/// ```
pub fn genome_id<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Strain identifiers of a batch, in input order.
///
/// Inputs that share a stem (`x.fa`, `x.fasta`) keep their full file names,
/// and the full path is the last resort, so no two genomes write to the same
/// table or summary row.
///
/// ```
/// let ids = cpstype::genome_ids(&["in/a.fa", "in/b.fa", "in/b.fasta"]);
/// assert_eq!(ids, vec!["a", "b.fa", "b.fasta"]);
/// ```
pub fn genome_ids<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    let file_name = |path: &P| {
        path.as_ref()
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    };

    let stems = paths.iter().map(genome_id).counts();
    let ids: Vec<String> = paths
        .iter()
        .map(|path| {
            let id = genome_id(path);
            if stems[&id] > 1 {
                file_name(path)
            } else {
                id
            }
        })
        .collect();

    let names = ids.iter().counts();
    ids.iter()
        .zip(paths)
        .map(|(id, path)| {
            if names[id] > 1 {
                path.as_ref().display().to_string()
            } else {
                id.clone()
            }
        })
        .collect()
}
