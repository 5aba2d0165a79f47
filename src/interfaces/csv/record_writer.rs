use crate::application::service::Registration;
use crate::domain::installment::Installment;
use crate::domain::listing::ClientSummary;
use crate::domain::report::{DashboardMetrics, DueCollection, ProductivityReport};
use crate::domain::route::RoutePlan;
use crate::domain::schedule::SchedulePlan;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ScheduleRow {
    number: u32,
    due_date: String,
    amount: String,
}

#[derive(Serialize)]
struct InstallmentRow {
    id: String,
    number: String,
    due_date: String,
    amount: String,
    status: String,
    payment_date: Option<String>,
}

#[derive(Serialize)]
struct ClientRow<'a> {
    id: String,
    name: &'a str,
    phone: &'a str,
    address: &'a str,
    total_amount: String,
    paid_amount: String,
    next_due: Option<String>,
    due_today: bool,
    open_amount: String,
}

#[derive(Serialize)]
struct CollectionRow<'a> {
    installment_id: String,
    client: &'a str,
    phone: &'a str,
    address: &'a str,
    amount: String,
}

#[derive(Serialize)]
struct RegistrationRow<'a> {
    id: String,
    name: &'a str,
    installments: usize,
    installment_amount: Option<String>,
    first_due: Option<String>,
}

#[derive(Serialize)]
struct MetricsRow {
    total_clients: usize,
    due_today: String,
    overdue: String,
    received: String,
}

#[derive(Serialize)]
struct ProductivityRow {
    from: String,
    to: String,
    visits: usize,
    successful: usize,
    collected: String,
    average_per_visit: String,
    conversion_rate: String,
    distance_km: String,
    minutes: u64,
    goal: String,
    goal_progress: String,
}

#[derive(Serialize)]
struct StopRow<'a> {
    stop: usize,
    client: &'a str,
    address: &'a str,
    distance_km: String,
}

/// Writes listings as CSV, one record per row with a header line.
pub struct RecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(sink),
        }
    }

    pub fn write_plan(&mut self, plan: &SchedulePlan) -> Result<()> {
        for (index, due_date) in plan.due_dates.iter().enumerate() {
            self.writer.serialize(ScheduleRow {
                number: index as u32 + 1,
                due_date: due_date.to_string(),
                amount: plan.installment_amount.to_string(),
            })?;
        }
        self.flush()
    }

    pub fn write_installments(&mut self, installments: &[Installment]) -> Result<()> {
        for installment in installments {
            self.writer.serialize(InstallmentRow {
                id: installment.id.to_string(),
                number: installment.position.to_string(),
                due_date: installment.due_date.to_string(),
                amount: installment.amount.to_string(),
                status: installment.status.to_string(),
                payment_date: installment.payment_date.map(|d| d.to_string()),
            })?;
        }
        self.flush()
    }

    pub fn write_clients(&mut self, summaries: &[ClientSummary]) -> Result<()> {
        for summary in summaries {
            let client = &summary.client;
            self.writer.serialize(ClientRow {
                id: client.id.to_string(),
                name: &client.name,
                phone: &client.phone,
                address: &client.address,
                total_amount: client.total_amount.to_string(),
                paid_amount: client.paid_amount.to_string(),
                next_due: summary.next_due.map(|d| d.to_string()),
                due_today: summary.due_today,
                open_amount: summary.open_amount.to_string(),
            })?;
        }
        self.flush()
    }

    pub fn write_collections(&mut self, collections: &[DueCollection]) -> Result<()> {
        for collection in collections {
            self.writer.serialize(CollectionRow {
                installment_id: collection.installment_id.to_string(),
                client: &collection.client_name,
                phone: &collection.phone,
                address: &collection.address,
                amount: collection.amount.to_string(),
            })?;
        }
        self.flush()
    }

    pub fn write_route(&mut self, plan: &RoutePlan) -> Result<()> {
        for (index, stop) in plan.stops.iter().enumerate() {
            self.writer.serialize(StopRow {
                stop: index + 1,
                client: &stop.client.name,
                address: &stop.client.address,
                distance_km: format!("{:.2}", stop.distance_km.unwrap_or_default()),
            })?;
        }
        self.flush()
    }

    pub fn write_registrations(&mut self, registrations: &[Registration]) -> Result<()> {
        for registration in registrations {
            let first = registration.installments.first();
            self.writer.serialize(RegistrationRow {
                id: registration.client.id.to_string(),
                name: &registration.client.name,
                installments: registration.installments.len(),
                installment_amount: first.map(|i| i.amount.to_string()),
                first_due: first.map(|i| i.due_date.to_string()),
            })?;
        }
        self.flush()
    }

    pub fn write_metrics(&mut self, metrics: &DashboardMetrics) -> Result<()> {
        self.writer.serialize(MetricsRow {
            total_clients: metrics.total_clients,
            due_today: metrics.due_today.to_string(),
            overdue: metrics.overdue.to_string(),
            received: metrics.received.to_string(),
        })?;
        self.flush()
    }

    pub fn write_productivity(&mut self, report: &ProductivityReport) -> Result<()> {
        self.writer.serialize(ProductivityRow {
            from: report.from.to_string(),
            to: report.to.to_string(),
            visits: report.total_visits,
            successful: report.successful_visits,
            collected: report.total_collected.to_string(),
            average_per_visit: report.average_per_visit.to_string(),
            conversion_rate: report.conversion_rate.to_string(),
            distance_km: format!("{:.2}", report.distance_km),
            minutes: report.minutes_spent,
            goal: report.goal.to_string(),
            goal_progress: report.goal_progress.to_string(),
        })?;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::Cadence;
    use crate::domain::money::Amount;
    use crate::domain::schedule::{self, ScheduleTerms};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_plan() {
        let plan = schedule::plan(
            Amount::new(dec!(300)).unwrap(),
            Cadence::Biweekly,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &ScheduleTerms::default(),
        )
        .unwrap();

        let mut buffer = Vec::new();
        RecordWriter::new(&mut buffer).write_plan(&plan).unwrap();
        let output = String::from_utf8(buffer).unwrap();

        assert_eq!(
            output,
            "number,due_date,amount\n1,2024-01-01,100.00\n2,2024-01-16,100.00\n3,2024-01-31,100.00\n"
        );
    }
}
