use assert_cmd::prelude::*;
use calamine::Reader;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn get_input_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/cps");
    path.push(filename);
    path
}

// Replays tests/cps/reports/<genome>.tsv; genomes without a report fail.
// The launcher lives in `dir`, the fixture script is left untouched.
#[cfg(unix)]
fn fake_blastn(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake_blastn");
    fs::write(
        &path,
        format!(
            "#!/bin/sh\nexec sh '{}' \"$@\"\n",
            get_input_path("fake_blastn.sh").display()
        ),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const SUMMARY: &str = "\
Strain,CAMP1045(kpsM),CAMP1046(kpsT),CAMP1050,CAMP1067(waaF)
strain_a,2,4,,1
strain_b,,,,
strain_c,,,1,2
";

#[test]
fn command_run_help() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cpstype")?;
    let output = cmd.arg("run").arg("--help").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("Calls CPS alleles of genome assemblies"));
    assert!(stdout.contains("--minid"));
    Ok(())
}

#[test]
fn command_run_requires_one_input() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .assert()
        .failure();

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("-f")
        .arg(get_input_path("genomes/strain_a.fasta"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));

    Ok(())
}

#[test]
fn command_run_bad_threshold() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--minid")
        .arg("120")
        .arg("-o")
        .arg(tempdir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--minid must be a percentage"));

    assert!(!tempdir.path().join("out").exists());
    Ok(())
}

#[test]
fn command_run_missing_aligner() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--blastn")
        .arg("cpstype-no-such-blastn")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in PATH"));

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_malformed_db() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let db = tempdir.path().join("bad.fa");
    fs::write(&db, ">CAMP1045_1\nACGT\n>CAMP1046\nACGT\n")?;
    let outdir = tempdir.path().join("out");

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("--db")
        .arg(&db)
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("-o")
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed reference header `CAMP1046`"));

    // aborted before any genome
    assert!(!outdir.join("strain_a_tab.txt").exists());
    assert!(!outdir.join("cpstype_summary.csv").exists());
    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_dir() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("cpstype")?;
    let output = cmd
        .arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--scheme")
        .arg(get_input_path("scheme.tsv"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("-o")
        .arg(tempdir.path())
        .output()?;
    let stderr = String::from_utf8(output.stderr)?;
    assert!(output.status.success(), "{}", stderr);

    assert!(stderr.contains("Skipping"));
    assert!(stderr.contains("notes.txt"));
    assert!(stderr.contains("Skipping alignment line 7"));
    assert!(stderr.contains("Excluding strain_d"));

    let summary = fs::read_to_string(tempdir.path().join("cpstype_summary.csv"))?;
    assert_eq!(summary, SUMMARY);

    let tab = fs::read_to_string(tempdir.path().join("strain_a_tab.txt"))?;
    assert_eq!(
        tab,
        "Loci\tAllele_Num\nCAMP1045\t2\nCAMP1046\t4\nCAMP1050\t\nCAMP1067\t1\n"
    );
    let tab = fs::read_to_string(tempdir.path().join("strain_b_tab.txt"))?;
    assert_eq!(tab.lines().count(), 5);
    assert!(!tempdir.path().join("strain_d_tab.txt").exists());
    assert!(!tempdir.path().join("notes_tab.txt").exists());

    let failed = fs::read_to_string(tempdir.path().join("cpstype_failed.tsv"))?;
    let lines: Vec<&str> = failed.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "Strain\tReason");
    assert!(lines[1].starts_with("strain_d\t"));

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_parallel_keeps_order() -> anyhow::Result<()> {
    for _ in 0..3 {
        let tempdir = TempDir::new()?;

        let mut cmd = Command::cargo_bin("cpstype")?;
        cmd.arg("run")
            .arg("-i")
            .arg(get_input_path("genomes"))
            .arg("--db")
            .arg(get_input_path("db.fa"))
            .arg("--scheme")
            .arg(get_input_path("scheme.tsv"))
            .arg("--blastn")
            .arg(fake_blastn(tempdir.path()))
            .arg("--parallel")
            .arg("4")
            .arg("-t")
            .arg("1")
            .arg("-o")
            .arg(tempdir.path())
            .assert()
            .success();

        let summary = fs::read_to_string(tempdir.path().join("cpstype_summary.csv"))?;
        assert_eq!(summary, SUMMARY);
    }

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_single_file() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-f")
        .arg(get_input_path("genomes/strain_c.fasta"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Processing"));

    // no scheme, raw locus ids
    let summary = fs::read_to_string(tempdir.path().join("cpstype_summary.csv"))?;
    assert_eq!(
        summary,
        "Strain,CAMP1045,CAMP1046,CAMP1050,CAMP1067\nstrain_c,,,1,2\n"
    );
    assert!(!tempdir.path().join("cpstype_failed.tsv").exists());

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_thresholds() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    // CAMP1046_1 covers 87.5% and CAMP1050_1 is 90% identical in strain_a
    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-f")
        .arg(get_input_path("genomes/strain_a.fasta"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("--minid")
        .arg("90")
        .arg("--mincov")
        .arg("85")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let tab = fs::read_to_string(tempdir.path().join("strain_a_tab.txt"))?;
    assert_eq!(
        tab,
        "Loci\tAllele_Num\nCAMP1045\t2\nCAMP1046\t1\nCAMP1050\t1\nCAMP1067\t1\n"
    );

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_empty_input() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let indir = tempdir.path().join("in");
    fs::create_dir(&indir)?;
    fs::write(indir.join("readme.md"), "# nothing here\n")?;
    let outdir = tempdir.path().join("out");

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(&indir)
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("-o")
        .arg(&outdir)
        .assert()
        .success()
        .stderr(predicate::str::contains("No FASTA files were found"));

    assert!(outdir.is_dir());
    assert!(!outdir.join("cpstype_summary.csv").exists());
    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_xlsx() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(get_input_path("genomes"))
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--scheme")
        .arg(get_input_path("scheme.tsv"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("--xlsx")
        .arg("-o")
        .arg(tempdir.path())
        .assert()
        .success();

    let path = tempdir.path().join("cpstype_summary.xlsx");
    let mut workbook: calamine::Xlsx<_> = calamine::open_workbook(&path).unwrap();
    let sheet = workbook.worksheet_range_at(0).unwrap().unwrap();

    // row-col
    assert_eq!(
        sheet.get_value((0, 1)).unwrap().to_string(),
        "CAMP1045(kpsM)".to_string()
    );
    assert_eq!(sheet.get_value((1, 0)).unwrap().to_string(), "strain_a".to_string());
    assert_eq!(sheet.get_value((3, 4)).unwrap().to_string(), "2".to_string());

    Ok(())
}

#[test]
#[cfg(unix)]
fn command_run_shared_stems() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let indir = tempdir.path().join("in");
    fs::create_dir(&indir)?;
    fs::copy(
        get_input_path("genomes/strain_c.fasta"),
        indir.join("strain_c.fa"),
    )?;
    fs::copy(
        get_input_path("genomes/strain_c.fasta"),
        indir.join("strain_c.fasta"),
    )?;
    let outdir = tempdir.path().join("out");

    let mut cmd = Command::cargo_bin("cpstype")?;
    cmd.arg("run")
        .arg("-i")
        .arg(&indir)
        .arg("--db")
        .arg(get_input_path("db.fa"))
        .arg("--blastn")
        .arg(fake_blastn(tempdir.path()))
        .arg("-o")
        .arg(&outdir)
        .assert()
        .success()
        .stderr(predicate::str::contains("shares its name"));

    let summary = fs::read_to_string(outdir.join("cpstype_summary.csv"))?;
    assert_eq!(
        summary,
        "Strain,CAMP1045,CAMP1046,CAMP1050,CAMP1067\n\
         strain_c.fa,,,1,2\n\
         strain_c.fasta,,,1,2\n"
    );
    assert!(outdir.join("strain_c.fa_tab.txt").is_file());
    assert!(outdir.join("strain_c.fasta_tab.txt").is_file());
    assert!(!outdir.join("strain_c_tab.txt").exists());

    Ok(())
}
