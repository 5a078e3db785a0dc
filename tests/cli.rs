use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn partner_table(dir: &Path) -> PathBuf {
    write(
        dir,
        "df_grouped.csv",
        "Jahr,Land,export_wert,import_wert\n\
         2023,China,100000000000,150000000000\n\
         2023,Frankreich,120000000000,70000000000\n\
         2023,Nicht ermittelte Länder und Gebiete,1000000000,9000000000\n\
         2024,China,90000000000,155000000000\n\
         2024,Frankreich,121000000000,69000000000\n\
         2024,Nicht ermittelte Länder und Gebiete,9000000000,1000000000\n",
    )
}

fn cmd() -> Command {
    Command::cargo_bin("trade-charts").unwrap()
}

fn render_json(args: &[&str]) -> serde_json::Value {
    let output = cmd().args(args).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn render_top_partners_prints_figures() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());

    let figures = render_json(&["render", "top-partners", "--data", data.to_str().unwrap(), "--year", "2024"]);
    let figures = figures.as_array().unwrap();
    assert_eq!(figures.len(), 3);
    assert!(figures[0]["title"].as_str().unwrap().contains("2024"));

    let categories: Vec<&str> = figures[0]["series"][0]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["category"].as_str().unwrap())
        .collect();
    assert_eq!(categories[0], "Frankreich");
    assert!(categories.contains(&"China"));
}

#[test]
fn diff_countries_skips_sentinel_partners() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());

    cmd()
        .args(["render", "diff-countries", "--compact", "--data"])
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("China"))
        .stdout(predicate::str::contains("Nicht ermittelte").not());
}

#[test]
fn render_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());
    let out = dir.path().join("figures.json");

    cmd()
        .args(["render", "diff-countries", "--data"])
        .arg(&data)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let figures: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(figures[0]["status"], "complete");
}

#[test]
fn unknown_year_fails() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());

    cmd()
        .args(["render", "top-partners", "--year", "1999", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("year 1999 is not present"));
}

#[test]
fn missing_column_fails() {
    let dir = TempDir::new().unwrap();
    let data = write(dir.path(), "bad.csv", "Jahr,Land,export_wert\n2024,China,1\n");

    cmd()
        .args(["render", "top-partners", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("import"));
}

#[test]
fn years_lists_each_year() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());

    cmd()
        .args(["years", "diff-countries", "--data"])
        .arg(&data)
        .assert()
        .success()
        .stdout("2023\n2024\n");
}

#[test]
fn views_lists_every_view() {
    let assert = cmd().arg("views").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for name in ["total-volume", "monthly", "top-partners", "top-goods", "diff-countries", "diff-goods"] {
        assert!(stdout.contains(name), "{name} missing from:\n{stdout}");
    }
}

#[test]
fn config_overrides_step() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "views.json", r#"{"diff-countries": {"step_size": 2e9}}"#);

    cmd()
        .args(["views", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 Mrd"));
}

#[test]
fn config_titles_reach_bar_charts() {
    let dir = TempDir::new().unwrap();
    let data = partner_table(dir.path());
    let config = write(
        dir.path(),
        "views.json",
        r#"{"top-partners": {"titles": {"export": "Meine Partner {year}"}}}"#,
    );

    let figures = render_json(&[
        "render",
        "top-partners",
        "--data",
        data.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert_eq!(figures[0]["title"], "Meine Partner 2024");
    assert_eq!(figures[1]["title"], "Top 10 Importländer im Jahr 2024");

    let config = write(dir.path(), "title.json", r#"{"top-partners": {"title": "Meine Partner"}}"#);
    cmd()
        .args(["views", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("'title' is not supported"));
}

#[test]
fn header_only_table_missing_a_column_fails() {
    let dir = TempDir::new().unwrap();
    let data = write(dir.path(), "empty.csv", "Jahr,Land,export_wert\n");

    cmd()
        .args(["years", "top-partners", "--data"])
        .arg(&data)
        .assert()
        .failure()
        .stderr(predicate::str::contains("column 'import'"));
}

#[test]
fn bad_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "views.json", r#"{"monthly": {"step_size": -1}}"#);

    cmd()
        .args(["views", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("step_size must be positive"));

    let config = write(dir.path(), "typo.json", r#"{"monthly": {"stepsize": 1e9}}"#);
    cmd()
        .args(["views", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn unknown_view_is_a_usage_error() {
    cmd()
        .args(["render", "pie-chart", "--data", "x.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown view"));
}
