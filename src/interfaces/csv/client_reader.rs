use crate::domain::client::{Cadence, NewClient};
use crate::domain::route::GeoPoint;
use crate::error::{CrediarioError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One line of a client import file.
#[derive(Debug, Deserialize)]
struct ClientRow {
    name: String,
    phone: String,
    address: String,
    total_amount: Decimal,
    #[serde(default)]
    payment_type: Option<Cadence>,
    #[serde(default)]
    first_payment_date: Option<NaiveDate>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl TryFrom<ClientRow> for NewClient {
    type Error = CrediarioError;

    fn try_from(row: ClientRow) -> Result<Self> {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)?),
            (None, None) => None,
            _ => {
                return Err(CrediarioError::validation(
                    "Latitude and longitude must be given together",
                ));
            }
        };
        Ok(NewClient {
            name: row.name,
            phone: row.phone,
            address: row.address,
            total_amount: row.total_amount,
            cadence: row.payment_type,
            first_payment_date: row.first_payment_date,
            location,
        })
    }
}

/// Reads client registrations from a CSV source.
///
/// Columns: `name, phone, address, total_amount, payment_type,
/// first_payment_date[, latitude, longitude]`. Fields are trimmed; trailing
/// optional columns may be left out.
pub struct ClientReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ClientReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one registration form per row.
    ///
    /// Rows are only parsed here; business validation happens when the form
    /// is registered.
    pub fn clients(self) -> impl Iterator<Item = Result<NewClient>> {
        self.reader
            .into_deserialize::<ClientRow>()
            .map(|result| result.map_err(CrediarioError::from).and_then(NewClient::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "name, phone, address, total_amount, payment_type, first_payment_date, latitude, longitude";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\nMaria, 11 9999-0000, Rua A 1, 520.00, semanal, 2024-01-01, -23.55, -46.63\nJoão, 11 8888-0000, Rua B 2, 300, monthly, 2024-02-15,,"
        );
        let results: Vec<Result<NewClient>> = ClientReader::new(data.as_bytes()).clients().collect();

        assert_eq!(results.len(), 2);
        let maria = results[0].as_ref().unwrap();
        assert_eq!(maria.total_amount, dec!(520));
        assert_eq!(maria.cadence, Some(Cadence::Weekly));
        assert!(maria.location.is_some());

        let joao = results[1].as_ref().unwrap();
        assert_eq!(joao.cadence, Some(Cadence::Monthly));
        assert_eq!(joao.first_payment_date, NaiveDate::from_ymd_opt(2024, 2, 15));
        assert!(joao.location.is_none());
    }

    #[test]
    fn test_reader_missing_optional_columns() {
        let data = "name, phone, address, total_amount\nAna, 1, Rua C, 100";
        let results: Vec<Result<NewClient>> = ClientReader::new(data.as_bytes()).clients().collect();
        let ana = results[0].as_ref().unwrap();
        assert_eq!(ana.cadence, None);
        assert_eq!(ana.first_payment_date, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nAna, 1, Rua C, abc, weekly, 2024-01-01,,\nBia, 2, Rua D, 10, daily, 2024-01-01,,");
        let results: Vec<Result<NewClient>> = ClientReader::new(data.as_bytes()).clients().collect();
        assert!(results[0].is_err());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_reader_half_coordinates() {
        let data = format!("{HEADER}\nAna, 1, Rua C, 10, weekly, 2024-01-01, -23.5,");
        let results: Vec<Result<NewClient>> = ClientReader::new(data.as_bytes()).clients().collect();
        assert!(results[0].as_ref().unwrap_err().is_validation());
    }
}
