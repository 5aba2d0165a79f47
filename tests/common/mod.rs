#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use crediario::application::service::CrediarioService;
use crediario::config::Settings;
use crediario::domain::client::{Cadence, NewClient};
use crediario::domain::route::GeoPoint;
use crediario::domain::session::Session;
use crediario::infrastructure::clock::FixedClock;
use crediario::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const EMAIL: &str = "cobranca@loja.com";
pub const PASSWORD: &str = "segredo";

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub struct Harness {
    pub service: CrediarioService,
    pub clock: Arc<FixedClock>,
    pub session: Session,
}

pub fn harness(now: DateTime<Utc>) -> Harness {
    let clock = Arc::new(FixedClock::new(now));
    let service = CrediarioService::new(
        Box::new(InMemoryStore::new()),
        clock.clone(),
        Settings::default(),
    );
    let session = service.login(EMAIL, PASSWORD).unwrap();
    Harness {
        service,
        clock,
        session,
    }
}

pub fn new_client(name: &str, total: Decimal, cadence: Cadence, first: NaiveDate) -> NewClient {
    NewClient {
        name: name.to_string(),
        phone: "11 90000-0000".to_string(),
        address: format!("Rua {name}, 1"),
        total_amount: total,
        cadence: Some(cadence),
        first_payment_date: Some(first),
        location: None,
    }
}

pub fn located(mut client: NewClient, latitude: f64, longitude: f64) -> NewClient {
    client.location = Some(GeoPoint::new(latitude, longitude).unwrap());
    client
}

pub fn write_clients_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record([
        "name",
        "phone",
        "address",
        "total_amount",
        "payment_type",
        "first_payment_date",
    ])?;
    for i in 1..=rows {
        wtr.write_record([
            format!("Cliente {i}").as_str(),
            "11 90000-0000",
            "Rua Principal",
            "300",
            "weekly",
            "2024-01-01",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
