use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 8] = [
    "lease_id",
    "lease_payment_id",
    "user_id",
    "amount",
    "currency",
    "method",
    "provider",
    "instrument",
];

/// Writes `rows` valid requests, alternating between the bank and card rails.
pub fn generate_requests_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;

    for i in 1..=rows {
        let lease = format!("lease-{}", i);
        let lease_payment = format!("lp-{}", i);
        let user = format!("user-{}", i);
        let (method, provider, instrument) = if i % 2 == 0 {
            ("card", "stripe", "tok_visa")
        } else {
            ("bank_transfer", "bank_api", "NL91ABNA0417164300")
        };
        wtr.write_record([
            lease.as_str(),
            lease_payment.as_str(),
            user.as_str(),
            "100.00",
            "USD",
            method,
            provider,
            instrument,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
