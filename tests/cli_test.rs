use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn crediario() -> Command {
    let mut cmd = Command::new(cargo_bin!("crediario"));
    cmd.env_remove("CREDIARIO_EMAIL")
        .env_remove("CREDIARIO_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn signed_in() -> Command {
    let mut cmd = crediario();
    cmd.env("CREDIARIO_EMAIL", "cobranca@loja.com")
        .env("CREDIARIO_PASSWORD", "segredo");
    cmd
}

#[test]
fn test_schedule_preview() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = crediario();
    cmd.args([
        "schedule",
        "--total",
        "520",
        "--cadence",
        "weekly",
        "--start",
        "2024-01-01",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("number,due_date,amount"))
        .stdout(predicate::str::contains("1,2024-01-01,47.27"))
        .stdout(predicate::str::contains("7,2024-02-12,47.27"))
        .stdout(predicate::str::contains("11,2024-03-11,47.27"))
        .stdout(predicate::str::contains("2024-03-18").not());

    Ok(())
}

#[test]
fn test_installment_size_from_environment() {
    let mut cmd = crediario();
    cmd.env("CREDIARIO_WEEKLY_INSTALLMENT", "100").args([
        "schedule",
        "--total",
        "300",
        "--cadence",
        "weekly",
        "--start",
        "2024-01-01",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("3,2024-01-15,100.00"))
        .stdout(predicate::str::contains("2024-01-22").not());
}

#[test]
fn test_schedule_rejects_non_positive_total() {
    let mut cmd = crediario();
    cmd.args([
        "schedule",
        "--total",
        "0",
        "--cadence",
        "mensal",
        "--start",
        "2024-01-31",
    ]);

    cmd.assert().failure();
}

#[test]
fn test_import_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = signed_in();
    cmd.arg("import").arg("tests/fixtures/clients.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "id,name,installments,installment_amount,first_due",
        ))
        .stdout(predicate::str::contains(",Maria Souza,11,47.27,2024-01-01"))
        .stdout(predicate::str::contains(",João Lima,3,100.00,2024-01-05"))
        .stdout(predicate::str::contains(",Ana Costa,7,142.86,2024-01-31"));

    Ok(())
}

#[test]
fn test_import_skips_bad_rows() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "name, phone, address, total_amount, payment_type, first_payment_date").unwrap();
    writeln!(csv, "Maria, 1, Rua A, 150, weekly, 2024-01-01").unwrap();
    writeln!(csv, "Joana, 2, Rua B, abc, weekly, 2024-01-01").unwrap();
    writeln!(csv, ", 3, Rua C, 100, weekly, 2024-01-01").unwrap();

    let mut cmd = signed_in();
    cmd.arg("import").arg(csv.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(",Maria,3,50.00,2024-01-01"))
        .stdout(predicate::str::contains("Joana").not())
        .stderr(predicate::str::contains("Error reading client"))
        .stderr(predicate::str::contains("Error registering client"));
}

#[test]
fn test_import_requires_credentials() {
    let mut cmd = crediario();
    cmd.arg("import").arg("tests/fixtures/clients.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Sign in to continue"));
}

#[test]
fn test_empty_dashboard() {
    let mut cmd = signed_in();
    cmd.arg("dashboard");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total_clients,due_today,overdue,received"))
        .stdout(predicate::str::contains("0,0.00,0.00,0.00"));
}

#[test]
fn test_route_without_clients_fails() {
    let mut cmd = signed_in();
    cmd.args(["route", "--lat", "-23.55", "--lon", "-46.63"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No clients nearby"));
}

#[test]
fn test_pay_unknown_installment() {
    let mut cmd = signed_in();
    cmd.args(["pay", "7b1f4c3e-8a47-4f51-9d0b-3f7a1c2e9b10", "50"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("installment not found"));
}
