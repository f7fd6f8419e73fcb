// Rolling-window analytics over a creator's payment records.
//
// The window covers the last `period` calendar days (UTC), today included,
// and both the overview and the daily series are derived from the same
// fetched set, so the series amounts always sum to the overview total.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Payment;
use crate::store::{Store, StoreResult};

pub const DEFAULT_PERIOD_DAYS: u32 = 30;
const RECENT_FEED_LEN: usize = 5;
const TOP_DONORS_LEN: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_amount: f64,
    pub average_amount: f64,
    pub total_payments: u64,
    pub unique_donors: u64,
    pub period: u32,
}

/// One calendar day of the series. Zero-payment days are present, zero-filled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub amount: f64,
    pub payments: u64,
    pub donors: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub overview: Overview,
    pub recent_payments: Vec<Payment>,
    pub chart_data: Vec<DayBucket>,
}

/// Daily series reshaped for `type=payments` responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayPaymentStats {
    pub date: String,
    pub count: u64,
    pub total: f64,
    pub average: f64,
    pub unique_donors: u64,
}

/// Per-donor rollup for `type=donors` responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorStats {
    pub from_address: String,
    pub donor_name: Option<String>,
    pub payment_count: u64,
    pub total_amount: f64,
    pub average_amount: f64,
    pub last_payment: DateTime<Utc>,
}

/// Start of the rolling window: midnight UTC, `period - 1` days back, so the
/// window spans exactly `period` calendar days ending today.
pub fn window_start(now: DateTime<Utc>, period: u32) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(period.saturating_sub(1) as i64);
    first_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

pub async fn creator_analytics(
    store: &dyn Store,
    creator_id: &str,
    period: u32,
) -> StoreResult<AnalyticsReport> {
    let now = Utc::now();
    let payments = store
        .payments_for_creator(creator_id, Some(window_start(now, period)), Some(now))
        .await?;
    Ok(aggregate(&payments, period, now))
}

/// Pure aggregation over an already-fetched window, newest first.
pub fn aggregate(payments: &[Payment], period: u32, now: DateTime<Utc>) -> AnalyticsReport {
    let total_amount: f64 = payments.iter().map(|p| p.amount).sum();
    let total_payments = payments.len() as u64;
    let average_amount = if total_payments > 0 {
        total_amount / total_payments as f64
    } else {
        0.0
    };
    let unique_donors = payments
        .iter()
        .map(|p| p.from_address.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let today = now.date_naive();
    let mut chart_data = Vec::with_capacity(period as usize);
    for offset in (0..period as i64).rev() {
        let date = today - Duration::days(offset);
        let day: Vec<&Payment> = payments
            .iter()
            .filter(|p| p.timestamp.date_naive() == date)
            .collect();
        chart_data.push(DayBucket {
            date: date.format("%Y-%m-%d").to_string(),
            amount: day.iter().map(|p| p.amount).sum(),
            payments: day.len() as u64,
            donors: day
                .iter()
                .map(|p| p.from_address.as_str())
                .collect::<HashSet<_>>()
                .len() as u64,
        });
    }

    let recent_payments = payments.iter().take(RECENT_FEED_LEN).cloned().collect();

    AnalyticsReport {
        overview: Overview {
            total_amount,
            average_amount,
            total_payments,
            unique_donors,
            period,
        },
        recent_payments,
        chart_data,
    }
}

pub fn daily_payment_stats(chart_data: &[DayBucket]) -> Vec<DayPaymentStats> {
    chart_data
        .iter()
        .map(|day| DayPaymentStats {
            date: day.date.clone(),
            count: day.payments,
            total: day.amount,
            average: if day.payments > 0 {
                day.amount / day.payments as f64
            } else {
                0.0
            },
            unique_donors: day.donors,
        })
        .collect()
}

/// Groups non-anonymous payments by sender address; the donor name shown is
/// the one attached to that address's most recent payment. Top 10 by total.
pub fn top_donors(payments: &[Payment]) -> Vec<DonorStats> {
    let mut by_address: HashMap<&str, DonorStats> = HashMap::new();

    for payment in payments.iter().filter(|p| !p.is_anonymous) {
        match by_address.get_mut(payment.from_address.as_str()) {
            Some(donor) => {
                donor.payment_count += 1;
                donor.total_amount += payment.amount;
                if payment.timestamp > donor.last_payment {
                    donor.last_payment = payment.timestamp;
                    donor.donor_name = payment.donor_name.clone();
                }
            }
            None => {
                by_address.insert(
                    &payment.from_address,
                    DonorStats {
                        from_address: payment.from_address.clone(),
                        donor_name: payment.donor_name.clone(),
                        payment_count: 1,
                        total_amount: payment.amount,
                        average_amount: 0.0,
                        last_payment: payment.timestamp,
                    },
                );
            }
        }
    }

    let mut donors: Vec<DonorStats> = by_address
        .into_values()
        .map(|mut d| {
            d.average_amount = d.total_amount / d.payment_count as f64;
            d
        })
        .collect();
    donors.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    donors.truncate(TOP_DONORS_LEN);
    donors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(
        tx: &str,
        amount: f64,
        from: &str,
        days_ago: i64,
        now: DateTime<Utc>,
    ) -> Payment {
        Payment::new(
            tx.into(),
            amount,
            from.into(),
            "0xcreator".into(),
            None,
            now - Duration::days(days_ago),
            "c1".into(),
        )
    }

    #[test]
    fn empty_window_yields_zeroes_not_errors() {
        let now = Utc::now();
        let report = aggregate(&[], 30, now);
        assert_eq!(report.overview.total_payments, 0);
        assert_eq!(report.overview.total_amount, 0.0);
        assert_eq!(report.overview.average_amount, 0.0);
        assert_eq!(report.overview.unique_donors, 0);
        assert_eq!(report.chart_data.len(), 30);
        assert!(report.chart_data.iter().all(|d| d.payments == 0));
        assert!(report.recent_payments.is_empty());
    }

    #[test]
    fn series_has_exactly_n_entries_oldest_first() {
        let now = Utc::now();
        let payments = vec![
            payment("0xT0", 2.0, "0xa", 0, now),
            payment("0xT1", 3.0, "0xb", 6, now),
        ];
        let report = aggregate(&payments, 7, now);

        assert_eq!(report.chart_data.len(), 7);
        let dates: Vec<&str> = report.chart_data.iter().map(|d| d.date.as_str()).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);

        // Oldest bucket holds the 6-day-old payment, newest holds today's.
        assert_eq!(report.chart_data[0].payments, 1);
        assert_eq!(report.chart_data[0].amount, 3.0);
        assert_eq!(report.chart_data[6].payments, 1);
        assert_eq!(report.chart_data[6].amount, 2.0);
        assert!(report.chart_data[1..6].iter().all(|d| d.payments == 0));
    }

    #[test]
    fn daily_amounts_sum_to_overview_total() {
        let now = Utc::now();
        let payments = vec![
            payment("0xT0", 1.5, "0xa", 0, now),
            payment("0xT1", 2.5, "0xb", 3, now),
            payment("0xT2", 4.0, "0xa", 3, now),
            payment("0xT3", 8.0, "0xc", 9, now),
        ];
        let report = aggregate(&payments, 10, now);
        let series_sum: f64 = report.chart_data.iter().map(|d| d.amount).sum();
        assert!((series_sum - report.overview.total_amount).abs() < 1e-9);
        assert_eq!(report.overview.total_amount, 16.0);
        assert_eq!(report.overview.average_amount, 4.0);
    }

    #[test]
    fn unique_donors_count_addresses_not_names() {
        let now = Utc::now();
        let mut first = payment("0xT0", 1.0, "0xsame", 0, now);
        first.donor_name = Some("Bob".into());
        let mut second = payment("0xT1", 2.0, "0xsame", 0, now);
        second.donor_name = Some("Robert".into());

        let report = aggregate(&[first, second], 7, now);
        assert_eq!(report.overview.unique_donors, 1);
        assert_eq!(report.chart_data.last().unwrap().donors, 1);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let now = Utc::now();
        let payments = vec![
            payment("0xT0", 1.0, "0xa", 1, now),
            payment("0xT1", 2.0, "0xb", 2, now),
        ];
        let a = aggregate(&payments, 14, now);
        let b = aggregate(&payments, 14, now);
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn recent_feed_is_capped_at_five_newest() {
        let now = Utc::now();
        let payments: Vec<Payment> = (0..8)
            .map(|i| payment(&format!("0xT{i}"), 1.0, "0xa", i, now))
            .collect();
        let report = aggregate(&payments, 30, now);
        assert_eq!(report.recent_payments.len(), 5);
        assert_eq!(report.recent_payments[0].tx_hash, "0xT0");
        assert!(report
            .recent_payments
            .windows(2)
            .all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn day_stats_average_is_zero_on_empty_days() {
        let now = Utc::now();
        let report = aggregate(&[payment("0xT0", 6.0, "0xa", 0, now)], 2, now);
        let stats = daily_payment_stats(&report.chart_data);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].average, 0.0);
        assert_eq!(stats[1].average, 6.0);
    }

    #[test]
    fn top_donors_ranked_by_total_excluding_anonymous() {
        let now = Utc::now();
        let mut small = payment("0xT0", 1.0, "0xsmall", 2, now);
        small.donor_name = Some("Small".into());
        let mut big_old = payment("0xT1", 5.0, "0xbig", 3, now);
        big_old.donor_name = Some("Old Name".into());
        let mut big_new = payment("0xT2", 5.0, "0xbig", 1, now);
        big_new.donor_name = Some("New Name".into());
        let mut anon = payment("0xT3", 100.0, "0xanon", 1, now);
        anon.is_anonymous = true;

        let donors = top_donors(&[small, big_old, big_new, anon]);
        assert_eq!(donors.len(), 2);
        assert_eq!(donors[0].from_address, "0xbig");
        assert_eq!(donors[0].total_amount, 10.0);
        assert_eq!(donors[0].average_amount, 5.0);
        assert_eq!(donors[0].donor_name.as_deref(), Some("New Name"));
        assert_eq!(donors[1].from_address, "0xsmall");
    }

    #[test]
    fn window_start_spans_period_calendar_days() {
        let now = Utc::now();
        let start = window_start(now, 30);
        assert_eq!((now.date_naive() - start.date_naive()).num_days(), 29);
        assert_eq!(start.time(), chrono::NaiveTime::MIN);
    }
}
