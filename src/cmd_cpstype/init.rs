use clap::*;
use cmd_lib::run_cmd;
use cpstype::Catalog;
use log::info;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("init")
        .about("Indexes the reference allele database")
        .after_help(
            r###"
Checks that every header of the reference FASTA is <locus><delimiter><allele number>,
then runs `makeblastdb -dbtype nucl` on it. The index files are written next to
the FASTA, so the same path can be given to `cpstype run --db`.

A malformed header aborts before makeblastdb is started.

Examples:
1. Index the bundled database:
   cpstype init db/CampyCPS.fa

2. Headers like >wzx|4:
   cpstype init alleles.fa --delimiter '|'

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Reference allele FASTA"),
        )
        .arg(
            Arg::new("delimiter")
                .long("delimiter")
                .num_args(1)
                .default_value("_")
                .help("Separator between locus and allele number in headers"),
        )
        .arg(
            Arg::new("makeblastdb")
                .long("makeblastdb")
                .num_args(1)
                .default_value("makeblastdb")
                .help("makeblastdb executable"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let opt_delimiter = args.get_one::<String>("delimiter").unwrap();
    let makeblastdb = args.get_one::<String>("makeblastdb").unwrap();

    let catalog = Catalog::from_fasta(infile, opt_delimiter)?;
    info!(
        "{} alleles of {} loci in {}",
        catalog.num_alleles(),
        catalog.num_loci(),
        infile
    );

    if which::which(makeblastdb).is_err() {
        anyhow::bail!("{} not found in PATH. Please install BLAST+ first.", makeblastdb);
    }

    info!("Creating blast database from {}", infile);
    run_cmd!(
        ${makeblastdb} -in ${infile} -dbtype nucl -out ${infile}
    )?;
    info!("Finished reference database creation");

    Ok(())
}
