use anyhow::Context;
use clap::*;
use cpstype::{Catalog, GenotypeOptions, Scheme, SummaryAggregator, Thresholds};
use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SUMMARY_CSV: &str = "cpstype_summary.csv";
pub const SUMMARY_XLSX: &str = "cpstype_summary.xlsx";
pub const FAILED_TSV: &str = "cpstype_failed.tsv";

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("run")
        .about("Calls CPS alleles of genome assemblies")
        .after_help(
            r###"
Each assembly is searched against the reference allele database with blastn.
For every locus of the database, the best hit passing both thresholds
(highest identity, then highest coverage, then first reported) gives the
allele number; loci without such a hit are left empty.

Outputs in --outdir:
* <genome>_tab.txt       - Loci and Allele_Num of one genome
* cpstype_summary.csv    - Strain by locus matrix of all genomes
* cpstype_summary.xlsx   - Same matrix, with --xlsx
* cpstype_failed.tsv     - Genomes whose alignment failed, if any

Notes:
* Reference headers must be <locus><delimiter><allele number>, e.g. >CAMP1067_3
* Run `cpstype init` on the reference FASTA once before typing
* Files in --indir that do not start with a FASTA header are skipped
* Columns are relabelled as locus(alias) when --scheme names the locus

Examples:
1. Type all assemblies of a directory:
   cpstype run -i assemblies/ --db db/CampyCPS.fa --scheme db/CPS_scheme.xlsx -o out

2. Type a single assembly with stricter thresholds:
   cpstype run -f GCF_000009085.fna --db db/CampyCPS.fa --minid 98 --mincov 95

3. Four genomes at a time, two aligner threads each:
   cpstype run -i assemblies/ --db db/CampyCPS.fa -p 4 -t 2

"###,
        )
        .arg(
            Arg::new("indir")
                .long("indir")
                .short('i')
                .num_args(1)
                .help("Directory of assembled genome files"),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .short('f')
                .num_args(1)
                .help("A single assembled genome file"),
        )
        .group(
            ArgGroup::new("input")
                .args(["indir", "file"])
                .required(true)
                .multiple(false),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .required(true)
                .num_args(1)
                .help("Reference allele FASTA, indexed by `cpstype init`"),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .num_args(1)
                .help("Locus naming scheme (.xlsx or .tsv) with `Loci` and `Gene/Aliases` columns"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value("cpstype_out")
                .help("Output directory, created if absent"),
        )
        .arg(
            Arg::new("minid")
                .long("minid")
                .num_args(1)
                .default_value("95")
                .value_parser(value_parser!(f64))
                .help("Minimum percent identity"),
        )
        .arg(
            Arg::new("mincov")
                .long("mincov")
                .num_args(1)
                .default_value("90")
                .value_parser(value_parser!(f64))
                .help("Minimum percent coverage of the reference allele"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .num_args(1)
                .default_value("8")
                .value_parser(value_parser!(usize))
                .help("Number of threads of each blastn process"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of genomes typed at the same time"),
        )
        .arg(
            Arg::new("delimiter")
                .long("delimiter")
                .num_args(1)
                .default_value("_")
                .help("Separator between locus and allele number in reference headers"),
        )
        .arg(
            Arg::new("blastn")
                .long("blastn")
                .num_args(1)
                .default_value("blastn")
                .help("blastn executable"),
        )
        .arg(
            Arg::new("xlsx")
                .long("xlsx")
                .action(ArgAction::SetTrue)
                .help("Also write the summary as an xlsx workbook"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let thresholds = Thresholds::new(
        *args.get_one::<f64>("minid").unwrap(),
        *args.get_one::<f64>("mincov").unwrap(),
    )?;
    let opt_db = args.get_one::<String>("db").unwrap();
    let opt_delimiter = args.get_one::<String>("delimiter").unwrap();
    let opt_blastn = args.get_one::<String>("blastn").unwrap();
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    let outdir = PathBuf::from(args.get_one::<String>("outdir").unwrap());

    //----------------------------
    // Fatal checks, before any genome
    //----------------------------
    if which::which(opt_blastn).is_err() {
        anyhow::bail!("{} not found in PATH. Please install BLAST+ first.", opt_blastn);
    }

    std::fs::create_dir_all(&outdir)
        .with_context(|| format!("could not create output directory {}", outdir.display()))?;

    let catalog = Catalog::from_fasta(opt_db, opt_delimiter)?;
    info!(
        "Loaded {} alleles of {} loci from {}",
        catalog.num_alleles(),
        catalog.num_loci(),
        opt_db
    );

    let mut opts = GenotypeOptions::new(opt_db);
    opts.thresholds = thresholds;
    opts.threads = *args.get_one::<usize>("threads").unwrap();
    opts.blastn = opt_blastn.to_string();
    opts.max_target_seqs = opts.max_target_seqs.max(catalog.num_alleles());

    let scheme = match args.get_one::<String>("scheme") {
        Some(path) => Scheme::from_path(path)?,
        None => Scheme::empty(),
    };

    //----------------------------
    // Inputs
    //----------------------------
    let candidates = if let Some(indir) = args.get_one::<String>("indir") {
        list_files(Path::new(indir))?
    } else {
        vec![PathBuf::from(args.get_one::<String>("file").unwrap())]
    };

    let genomes: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| {
            let keep = path.is_file() && cpstype::is_fasta(path);
            if !keep {
                info!("Skipping {}: not a FASTA file", path.display());
            }
            keep
        })
        .collect();

    if genomes.is_empty() {
        warn!("No FASTA files were found, please check the input path. No summary written.");
        return Ok(());
    }
    let genome_ids = cpstype::genome_ids(&genomes);

    //----------------------------
    // Ops
    //----------------------------
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel.max(1))
        .build()?;

    // collect() keeps the input order
    let results: Vec<_> = pool.install(|| {
        genomes
            .par_iter()
            .map(|path| {
                info!("Processing {}", path.display());
                (path, cpstype::type_genome(path, &catalog, &opts))
            })
            .collect()
    });

    let mut aggregator = SummaryAggregator::new(&catalog);
    let mut failed: Vec<(String, String)> = vec![];

    for ((path, result), genome_id) in results.into_iter().zip(genome_ids) {
        if genome_id != cpstype::genome_id(path) {
            warn!("{} shares its name with another input, named {}", path.display(), genome_id);
        }

        match result {
            Ok(result) => {
                let outfile = outdir.join(format!("{}_tab.txt", genome_id.replace('/', "_")));
                let mut writer = cpstype::writer(&outfile)?;
                result.write_tsv(&mut writer)?;
                info!(
                    "Finished {}: {} of {} loci present, writing results to {}",
                    path.display(),
                    result.num_present(),
                    result.len(),
                    outfile.display()
                );
                aggregator.add(genome_id, result);
            }
            Err(e) => {
                warn!("Excluding {} from the summary: {}", genome_id, e);
                failed.push((genome_id, e.to_string()));
            }
        }
    }

    //----------------------------
    // Output
    //----------------------------
    let matrix = aggregator.finalize(&scheme);

    let summary_file = outdir.join(SUMMARY_CSV);
    matrix.write_csv(cpstype::writer(&summary_file)?)?;
    info!(
        "Summary of {} genomes written to {}",
        matrix.rows().len(),
        summary_file.display()
    );

    if args.get_flag("xlsx") {
        let xlsx_file = outdir.join(SUMMARY_XLSX);
        matrix.write_xlsx(&xlsx_file)?;
        info!("Summary workbook written to {}", xlsx_file.display());
    }

    if !failed.is_empty() {
        let failed_file = outdir.join(FAILED_TSV);
        let mut writer = cpstype::writer(&failed_file)?;
        writer.write_all(b"Strain\tReason\n")?;
        for (genome_id, reason) in &failed {
            writer.write_fmt(format_args!("{}\t{}\n", genome_id, reason.replace('\n', " ")))?;
        }
        writer.flush()?;
        warn!(
            "{} genome(s) failed and were excluded: {}",
            failed.len(),
            failed.iter().map(|(id, _)| id).join(", ")
        );
    }

    Ok(())
}

/// Regular files of a directory, sorted by name.
fn list_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("could not read input directory {}", dir.display()))?;

    let mut files = vec![];
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}
