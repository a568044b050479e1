use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const HEADER: [&str; 8] = [
    "lease_id",
    "lease_payment_id",
    "user_id",
    "amount",
    "currency",
    "method",
    "provider",
    "instrument",
];

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(HEADER).unwrap();

    // Valid card payment
    wtr.write_record(["lease-1", "lp-1", "u-1", "10.0", "USD", "card", "stripe", "tok_visa"])
        .unwrap();
    // Amount is not a number
    wtr.write_record(["lease-2", "lp-2", "u-2", "ten", "USD", "card", "stripe", "tok_visa"])
        .unwrap();
    // Missing amount
    wtr.write_record(["lease-3", "lp-3", "u-3", "", "USD", "card", "stripe", "tok_visa"])
        .unwrap();
    // Valid card payment again
    wtr.write_record(["lease-4", "lp-4", "u-4", "20.0", "USD", "card", "stripe", "tok_visa"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("lease-settlement"));
    cmd.arg(&output_path).arg("--poll-interval-ms").arg("10");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading payment request"))
        .stdout(predicate::str::contains(",lease-1,stripe,10,USD,COMPLETED,"))
        .stdout(predicate::str::contains(",lease-4,stripe,20,USD,COMPLETED,"))
        .stdout(predicate::str::contains("lease-2").not())
        .stdout(predicate::str::contains("lease-3").not());
}

#[test]
fn test_rejected_requests_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("rejections.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(HEADER).unwrap();

    // Non-positive amount never reaches storage
    wtr.write_record(["lease-1", "lp-1", "u-1", "-5", "USD", "card", "stripe", "tok_visa"])
        .unwrap();
    // Lowercase currency fails rail validation
    wtr.write_record(["lease-2", "lp-2", "u-2", "5", "usd", "card", "stripe", "tok_visa"])
        .unwrap();
    // Bank account too short
    wtr.write_record(["lease-3", "lp-3", "u-3", "5", "USD", "bank_transfer", "bank_api", "1234"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("lease-settlement"));
    cmd.arg(&output_path).arg("--poll-interval-ms").arg("10");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Payment rejected for lease lease-1"))
        .stderr(predicate::str::contains("Payment rejected for lease lease-2"))
        .stderr(predicate::str::contains("Payment rejected for lease lease-3"))
        .stdout(predicate::str::contains("lease-1").not())
        .stdout(predicate::str::contains(",lease-2,stripe,5,usd,FAILED,,,false"))
        .stdout(predicate::str::contains(",lease-3,bank_api,5,USD,FAILED,,,false"));
}

#[test]
fn test_bank_rail_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("bank_down.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(HEADER).unwrap();
    wtr.write_record([
        "lease-1",
        "lp-1",
        "u-1",
        "5",
        "USD",
        "bank_transfer",
        "bank_api",
        "DE89370400440532013000",
    ])
    .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("lease-settlement"));
    cmd.arg(&output_path).arg("--bank-endpoint").arg("");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Provider unavailable"))
        .stdout(predicate::str::contains(",lease-1,bank_api,5,USD,FAILED,,,false"));
}
