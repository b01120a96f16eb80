//! Dashboard counters and reservation reports.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use ehm_bookings::{ReservationStatus, ReservationType};
use ehm_infra::store::{GroupKey, GroupRow, RecordFilter};

use super::{date_range, AppServices};
use crate::app::dto::present;
use crate::app::errors::{Resource, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    #[default]
    Monthly,
    Yearly,
}

impl Period {
    /// Unknown or missing values mean monthly.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("daily") => Period::Daily,
            Some("yearly") => Period::Yearly,
            _ => Period::Monthly,
        }
    }

    /// Inclusive UTC bounds of the period containing `now`.
    pub fn range(self, now: DateTime<Utc>) -> DateRange {
        let today = now.date_naive();
        let (first, next) = match self {
            Period::Daily => (today, today.succ_opt()),
            Period::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                (first, next)
            }
            Period::Yearly => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1),
            ),
        };
        let start = first.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = next
            .map(|n| n.and_time(chrono::NaiveTime::MIN).and_utc() - Duration::milliseconds(1))
            .unwrap_or(now);
        DateRange { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TypeTotal {
    pub amount: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub period: Period,
    pub date_range: DateRange,
    /// Every reservation type, zero-filled.
    pub statistics: BTreeMap<&'static str, TypeTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookings: u64,
    pub pending_reservations: u64,
    pub total_customers: u64,
    pub total_suppliers: u64,
    pub total_invoices: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user: DashboardUser,
    pub stats: DashboardStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub key: Option<String>,
    pub total_amount: f64,
    pub total_reservations: u64,
    pub average_amount: f64,
}

impl From<GroupRow> for ReportRow {
    fn from(row: GroupRow) -> Self {
        Self {
            key: row.key,
            total_amount: row.total,
            total_reservations: row.count,
            average_amount: row.average,
        }
    }
}

fn revenue_filter() -> RecordFilter {
    RecordFilter::new().is_in(
        "status",
        ReservationStatus::REVENUE
            .iter()
            .map(|s| JsonValue::from(s.as_str()))
            .collect(),
    )
}

impl AppServices {
    pub async fn dashboard(&self, user: DashboardUser) -> Result<Dashboard, ServiceError> {
        let err = || ServiceError::store(Resource::Reservation, "fetching dashboard data");
        let all = RecordFilter::new();
        let pending = RecordFilter::new().eq("status", ReservationStatus::Pending.as_str());
        let revenue: f64 = self
            .reservations
            .group(&revenue_filter(), GroupKey::Field("status".into()), Some("amount"))
            .await
            .map_err(err())?
            .iter()
            .map(|row| row.total)
            .sum();

        Ok(Dashboard {
            user,
            stats: DashboardStats {
                total_bookings: self.reservations.count(&all).await.map_err(err())?,
                pending_reservations: self.reservations.count(&pending).await.map_err(err())?,
                total_customers: self.customers.count(&all).await.map_err(err())?,
                total_suppliers: self.suppliers.count(&all).await.map_err(err())?,
                total_invoices: self.invoices.count(&all).await.map_err(err())?,
                revenue,
            },
        })
    }

    /// Confirmed and completed reservation totals per type for the current period.
    pub async fn statistics(&self, q: &StatisticsQuery) -> Result<Statistics, ServiceError> {
        let period = Period::parse(present(&q.period));
        let date_range = period.range(Utc::now());
        let filter = revenue_filter().created_between(Some(date_range.start), Some(date_range.end));
        let rows = self
            .reservations
            .group(&filter, GroupKey::Field("type".into()), Some("amount"))
            .await
            .map_err(ServiceError::store(Resource::Reservation, "fetching statistics"))?;

        let mut statistics: BTreeMap<&'static str, TypeTotal> = ReservationType::ALL
            .iter()
            .map(|t| (t.as_str(), TypeTotal::default()))
            .collect();
        for row in rows {
            let Some(kind) = row.key.as_deref().and_then(|k| k.parse::<ReservationType>().ok()) else {
                continue;
            };
            statistics.insert(
                kind.as_str(),
                TypeTotal {
                    amount: row.total,
                    count: row.count,
                },
            );
        }

        Ok(Statistics {
            period,
            date_range,
            statistics,
        })
    }

    /// Reservation totals grouped by type, status or creation month,
    /// largest total first.
    pub async fn reservation_report(
        &self,
        q: &ReservationReportQuery,
    ) -> Result<Vec<ReportRow>, ServiceError> {
        let key = match present(&q.group_by).unwrap_or("type") {
            "type" => GroupKey::Field("type".into()),
            "status" => GroupKey::Field("status".into()),
            "month" => GroupKey::CreatedMonth,
            other => {
                return Err(ServiceError::BadRequest(format!(
                    "groupBy must be one of: type, status, month (got '{other}')"
                )));
            }
        };
        let (from, to) = date_range(
            ("startDate", present(&q.start_date)),
            ("endDate", present(&q.end_date)),
        )?;
        let filter = RecordFilter::new()
            .eq_opt("type", present(&q.kind))
            .created_between(from, to);

        let mut rows: Vec<ReportRow> = self
            .reservations
            .group(&filter, key, Some("amount"))
            .await
            .map_err(ServiceError::store(Resource::Reservation, "fetching reservation reports"))?
            .into_iter()
            .map(ReportRow::from)
            .collect();
        rows.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount).then_with(|| a.key.cmp(&b.key)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ehm_bookings::{NewReservation, ReservationPatch};
    use ehm_core::RecordId;
    use ehm_parties::NewCustomer;

    use super::*;

    #[test]
    fn period_ranges_cover_whole_units() {
        let now = Utc.with_ymd_and_hms(2024, 12, 15, 10, 30, 0).unwrap();

        let day = Period::Daily.range(now);
        assert_eq!(day.start, Utc.with_ymd_and_hms(2024, 12, 15, 0, 0, 0).unwrap());
        assert_eq!(day.end, Utc.with_ymd_and_hms(2024, 12, 16, 0, 0, 0).unwrap() - Duration::milliseconds(1));

        let month = Period::Monthly.range(now);
        assert_eq!(month.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(month.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() - Duration::milliseconds(1));

        let year = Period::Yearly.range(now);
        assert_eq!(year.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(year.end, month.end);
    }

    #[test]
    fn unknown_period_is_monthly() {
        assert_eq!(Period::parse(Some("weekly")), Period::Monthly);
        assert_eq!(Period::parse(Some("Daily")), Period::Daily);
        assert_eq!(Period::parse(None), Period::Monthly);
    }

    async fn book(svc: &AppServices, customer: RecordId, kind: &str, amount: f64, status: &str) {
        let created = svc
            .create_reservation(
                NewReservation {
                    customer: Some(customer.to_string()),
                    kind: Some(kind.into()),
                    destination: Some("Cairo".into()),
                    amount: Some(amount),
                    ..NewReservation::default()
                },
                None,
            )
            .await
            .unwrap();
        let id: RecordId = created["id"].as_str().unwrap().parse().unwrap();
        svc.update_reservation(
            id,
            ReservationPatch {
                status: Some(status.into()),
                ..ReservationPatch::default()
            },
        )
        .await
        .unwrap();
    }

    async fn seeded() -> AppServices {
        let svc = AppServices::in_memory();
        let c = svc
            .create_customer(
                NewCustomer {
                    customer_name: Some("Hana".into()),
                    telephone: Some("1".into()),
                    country: Some("Egypt".into()),
                    ..NewCustomer::default()
                },
                None,
            )
            .await
            .unwrap();
        book(&svc, c.id, "flight", 300.0, "confirmed").await;
        book(&svc, c.id, "flight", 100.0, "completed").await;
        book(&svc, c.id, "hotel", 1000.0, "cancelled").await;
        book(&svc, c.id, "visa", 50.0, "pending").await;
        svc
    }

    fn viewer() -> DashboardUser {
        DashboardUser {
            name: "Admin".into(),
            email: "admin@egyptholiday.com".into(),
            role: "admin".into(),
        }
    }

    #[tokio::test]
    async fn dashboard_counts_revenue_from_confirmed_and_completed() {
        let svc = seeded().await;
        let dash = svc.dashboard(viewer()).await.unwrap();
        assert_eq!(dash.stats.total_bookings, 4);
        assert_eq!(dash.stats.pending_reservations, 1);
        assert_eq!(dash.stats.total_customers, 1);
        assert_eq!(dash.stats.revenue, 400.0);
    }

    #[tokio::test]
    async fn statistics_zero_fill_every_type() {
        let svc = seeded().await;
        let stats = svc.statistics(&StatisticsQuery::default()).await.unwrap();
        assert_eq!(stats.period, Period::Monthly);
        assert_eq!(stats.statistics.len(), ReservationType::ALL.len());
        assert_eq!(stats.statistics["flight"], TypeTotal { amount: 400.0, count: 2 });
        assert_eq!(stats.statistics["hotel"], TypeTotal::default());
        assert_eq!(stats.statistics["visa"], TypeTotal::default());
    }

    #[tokio::test]
    async fn report_groups_and_sorts_by_total() {
        let svc = seeded().await;
        let rows = svc.reservation_report(&ReservationReportQuery::default()).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_deref().unwrap()).collect();
        assert_eq!(keys, vec!["hotel", "flight", "visa"]);
        assert_eq!(rows[1].total_reservations, 2);
        assert_eq!(rows[1].average_amount, 200.0);

        let q = ReservationReportQuery {
            group_by: Some("status".into()),
            kind: Some("flight".into()),
            ..ReservationReportQuery::default()
        };
        let rows = svc.reservation_report(&q).await.unwrap();
        assert_eq!(rows.len(), 2);

        let q = ReservationReportQuery {
            group_by: Some("month".into()),
            ..ReservationReportQuery::default()
        };
        let rows = svc.reservation_report(&q).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.as_deref(), Some(Utc::now().format("%Y-%m").to_string().as_str()));

        let q = ReservationReportQuery {
            group_by: Some("weekday".into()),
            ..ReservationReportQuery::default()
        };
        assert!(svc.reservation_report(&q).await.is_err());
    }
}
