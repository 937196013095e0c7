extern crate clap;
use clap::*;

mod cmd_cpstype;

fn main() -> anyhow::Result<()> {
    let app = Command::new("cpstype")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`cpstype` - Capsule-locus gene-content typing of bacterial assemblies")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_cpstype::init::make_subcommand())
        .subcommand(cmd_cpstype::run::make_subcommand())
        .after_help(
            r###"Subcommands:

* init - Index the reference allele database with makeblastdb
* run  - Call CPS alleles for one assembly or a directory of assemblies

Logging goes to stderr; set RUST_LOG=debug for more detail.

"###,
        );

    let matches = app.get_matches();

    let verbose = matches
        .subcommand()
        .map(|(_, sub)| sub.get_flag("verbose"))
        .unwrap_or(false);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("init", sub_matches)) => cmd_cpstype::init::execute(sub_matches),
        Some(("run", sub_matches)) => cmd_cpstype::run::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
