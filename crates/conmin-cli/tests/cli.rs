use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TITULO: &str = "\
CONSERVADOR DE MINAS DE COPIAPÓ
ROL NACIONAL N° 12345-7
Inscrita a fojas 123 número 456 del año 1998.
Norte: 6.345.210 Este: 345.210 Huso 19
";

/// `conmin` with the user config directory pointed at `home`.
fn conmin(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("conmin").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

#[test]
fn test_process_text_file_as_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("titulo.txt");
    fs::write(&input, TITULO).unwrap();

    let output = conmin(dir.path())
        .arg("process")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["row"]["rol_nacional"], "12345-7");
    assert_eq!(report["row"]["fojas"], "123");
    assert_eq!(report["record"]["fields"]["ROL_NACIONAL"]["status"], "ACCEPTED");
    assert_eq!(report["record"]["document_id"], "titulo.txt");
}

#[test]
fn test_process_csv_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("titulo.txt");
    fs::write(&input, TITULO).unwrap();

    conmin(dir.path())
        .args(["process", "--format", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "archivo,pagina,rol_nacional,nombre_concesion,titular,superficie,fojas,numero,anio,conservador,tipo_fuente,confianza,texto_bruto",
        ))
        .stdout(predicate::str::contains("titulo.txt,1,12345-7"));
}

#[test]
fn test_process_missing_file() {
    let dir = TempDir::new().unwrap();
    conmin(dir.path())
        .args(["process", "no_existe.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_writes_summary_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("titulos");
    let output = dir.path().join("salida");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("a.txt"), TITULO).unwrap();
    fs::write(input.join("b.txt"), "ROL NACIONAL N° 99999-1").unwrap();
    fs::write(input.join("b.ocr.json"), r#"{"pages": []}"#).unwrap();

    conmin(dir.path())
        .arg("batch")
        .arg(&input)
        .arg("--output-dir")
        .arg(&output)
        .args(["--jobs", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful"));

    let csv = fs::read_to_string(output.join("auditoria_resultados.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("a.txt,"));
    assert!(lines[2].starts_with("b.txt,1,99999-1,"));

    let json = fs::read_to_string(output.join("auditoria_resultados.json")).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["archivo"], "a.txt");
}

#[test]
fn test_batch_stops_on_unreadable_document() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vacio.txt"), "").unwrap();

    conmin(dir.path())
        .arg("batch")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(dir.path().join("salida"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("vacio.txt"));
}

#[test]
fn test_batch_continue_on_error_records_failures() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("salida");
    fs::write(dir.path().join("vacio.txt"), "").unwrap();
    fs::write(dir.path().join("titulo.txt"), TITULO).unwrap();

    conmin(dir.path())
        .arg("batch")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&output)
        .arg("--continue-on-error")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 1 failed"));

    let errors = fs::read_to_string(output.join("auditoria_errores.csv")).unwrap();
    assert!(errors.contains("vacio.txt"));
    assert!(output.join("auditoria_resultados.csv").exists());
}

#[test]
fn test_rules_listing_respects_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"rules": {"disabled": ["rol.abreviado"]}}"#).unwrap();

    conmin(dir.path())
        .args(["rules", "--field", "rol_nacional"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rol.etiqueta"))
        .stdout(predicate::str::contains("rol.abreviado"));

    conmin(dir.path())
        .args(["rules", "--field", "rol_nacional", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("rol.etiqueta"))
        .stdout(predicate::str::contains("rol.abreviado").not());
}

#[test]
fn test_unknown_rule_in_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"rules": {"disabled": ["no.existe"]}}"#).unwrap();

    conmin(dir.path())
        .arg("rules")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no.existe"));
}

#[test]
fn test_config_init_and_validate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("conmin.json");

    conmin(dir.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    conmin(dir.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    conmin(dir.path())
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_inspect_lists_candidates() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("titulo.txt");
    fs::write(&input, TITULO).unwrap();

    conmin(dir.path())
        .args(["inspect", "--field", "FOJAS", "--json"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("fojas.etiqueta"))
        .stdout(predicate::str::contains("ROL_NACIONAL").not());
}

#[test]
fn test_batch_rerun_ignores_its_own_summaries() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("titulo.txt"), TITULO).unwrap();

    for _ in 0..2 {
        conmin(dir.path())
            .arg("batch")
            .arg(dir.path())
            .arg("--output-dir")
            .arg(dir.path())
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 successful"));
    }

    assert!(dir.path().join("titulo.txt.json").exists());
    let json = fs::read_to_string(dir.path().join("auditoria_resultados.json")).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.len(), 1);
}
