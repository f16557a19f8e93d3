use std::collections::HashMap;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone};
use serde::Serialize;

use super::search::local_midnight_millis;
use crate::models::FaultDiagnosis;
use crate::region::normalize_to_province;

/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "全部品类";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DashboardGranularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DashboardGranularity {
    /// Calendar window `[start, end)` containing `reference`.
    pub fn window(self, reference: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let start = match self {
            Self::Day => reference,
            Self::Week => reference.checked_sub_days(Days::new(u64::from(
                reference.weekday().num_days_from_monday(),
            )))?,
            Self::Month => reference.with_day(1)?,
            Self::Quarter => {
                let first_month = (reference.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(reference.year(), first_month, 1)?
            }
            Self::Year => NaiveDate::from_ymd_opt(reference.year(), 1, 1)?,
        };
        let end = match self {
            Self::Day => start.checked_add_days(Days::new(1))?,
            Self::Week => start.checked_add_days(Days::new(7))?,
            Self::Month => start.checked_add_months(Months::new(1))?,
            Self::Quarter => start.checked_add_months(Months::new(3))?,
            Self::Year => start.checked_add_months(Months::new(12))?,
        };
        Some((start, end))
    }
}

/// A labelled count, ready for a bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCount {
    pub name: String,
    pub value: usize,
}

/// Aggregates shown on the dashboard for one time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_cases: usize,
    pub province_count: usize,
    pub region_stats: Vec<StatCount>,
    pub issue_stats: Vec<StatCount>,
}

/// Records whose timestamp falls in the window around `reference`, local time.
pub fn records_in_window<'a, Tz: TimeZone>(
    history: &'a [FaultDiagnosis],
    granularity: DashboardGranularity,
    reference: &DateTime<Tz>,
) -> Vec<&'a FaultDiagnosis> {
    let tz = reference.timezone();
    let Some((start, end)) = granularity.window(reference.date_naive()) else {
        return Vec::new();
    };
    let start_ms = local_midnight_millis(&tz, start);
    let end_ms = local_midnight_millis(&tz, end);

    history
        .iter()
        .filter(|d| d.timestamp >= start_ms && d.timestamp < end_ms)
        .collect()
}

/// Case count per province, most frequent first.
pub fn region_stats(records: &[&FaultDiagnosis]) -> Vec<StatCount> {
    count_by(records.iter().map(|d| normalize_to_province(&d.source_region)))
}

/// With no category (or `ALL_CATEGORIES`), counts per category; otherwise
/// counts per fault issue within that category.
pub fn issue_stats(records: &[&FaultDiagnosis], category: Option<&str>) -> Vec<StatCount> {
    match category.filter(|c| *c != ALL_CATEGORIES) {
        None => count_by(records.iter().map(|d| d.category.as_str())),
        Some(category) => count_by(
            records
                .iter()
                .filter(|d| d.category == category)
                .map(|d| d.result.fault_issue.as_str()),
        ),
    }
}

pub fn dashboard_summary<Tz: TimeZone>(
    history: &[FaultDiagnosis],
    granularity: DashboardGranularity,
    reference: &DateTime<Tz>,
    category: Option<&str>,
) -> DashboardSummary {
    let records = records_in_window(history, granularity, reference);
    let region_stats = region_stats(&records);
    let issue_stats = issue_stats(&records, category);

    tracing::debug!(
        granularity = ?granularity,
        total = records.len(),
        provinces = region_stats.len(),
        "Dashboard summary computed"
    );

    DashboardSummary {
        total_cases: records.len(),
        province_count: region_stats.len(),
        region_stats,
        issue_stats,
    }
}

/// Descending by count; ties by name so output is stable.
fn count_by<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<StatCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut stats: Vec<StatCount> = counts
        .into_iter()
        .map(|(name, value)| StatCount {
            name: name.to_string(),
            value,
        })
        .collect();
    stats.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    stats
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{DiagnosisResult, ProcessingStatus, Severity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn case(region: &str, category: &str, issue: &str, when: DateTime<Utc>) -> FaultDiagnosis {
        FaultDiagnosis {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: when.timestamp_millis(),
            product_name: "产品".into(),
            category: category.into(),
            description: "描述".into(),
            source_region: region.into(),
            remark: None,
            status: ProcessingStatus::Unprocessed,
            tracking_number: None,
            image_url: None,
            result: DiagnosisResult {
                fault_issue: issue.into(),
                confidence: 0.6,
                severity: Severity::Medium,
                reasoning: String::new(),
                suggested_actions: vec![],
                estimated_repair_cost: String::new(),
            },
            actual_result: None,
            feedback: None,
        }
    }

    #[test]
    fn windows_are_half_open_calendar_periods() {
        let reference = date(2025, 8, 14); // Thursday
        assert_eq!(
            DashboardGranularity::Day.window(reference),
            Some((date(2025, 8, 14), date(2025, 8, 15)))
        );
        assert_eq!(
            DashboardGranularity::Week.window(reference),
            Some((date(2025, 8, 11), date(2025, 8, 18)))
        );
        assert_eq!(
            DashboardGranularity::Month.window(reference),
            Some((date(2025, 8, 1), date(2025, 9, 1)))
        );
        assert_eq!(
            DashboardGranularity::Quarter.window(reference),
            Some((date(2025, 7, 1), date(2025, 10, 1)))
        );
        assert_eq!(
            DashboardGranularity::Year.window(reference),
            Some((date(2025, 1, 1), date(2026, 1, 1)))
        );
    }

    #[test]
    fn december_month_rolls_into_next_year() {
        assert_eq!(
            DashboardGranularity::Month.window(date(2025, 12, 31)),
            Some((date(2025, 12, 1), date(2026, 1, 1)))
        );
        assert_eq!(
            DashboardGranularity::Quarter.window(date(2025, 11, 5)),
            Some((date(2025, 10, 1), date(2026, 1, 1)))
        );
    }

    #[test]
    fn window_excludes_end_boundary() {
        let reference = Utc.with_ymd_and_hms(2025, 8, 14, 10, 0, 0).unwrap();
        let history = vec![
            case("江苏省", "洗车器", "a", Utc.with_ymd_and_hms(2025, 8, 14, 0, 0, 0).unwrap()),
            case("江苏省", "洗车器", "a", Utc.with_ymd_and_hms(2025, 8, 15, 0, 0, 0).unwrap()),
        ];
        assert_eq!(
            records_in_window(&history, DashboardGranularity::Day, &reference).len(),
            1
        );
    }

    #[test]
    fn region_stats_normalize_and_sort_descending() {
        let now = Utc::now();
        let history = vec![
            case("江苏省", "洗车器", "a", now),
            case("南京", "洗车器", "a", now),
            case("广东省", "吸尘器", "b", now),
        ];
        let refs: Vec<&FaultDiagnosis> = history.iter().collect();
        let stats = region_stats(&refs);
        assert_eq!(
            stats,
            vec![
                StatCount { name: "江苏省".into(), value: 2 },
                StatCount { name: "广东省".into(), value: 1 },
            ]
        );
    }

    #[test]
    fn issue_stats_by_category_or_issue() {
        let now = Utc::now();
        let history = vec![
            case("江苏省", "洗车器", "密封阀磨损", now),
            case("江苏省", "洗车器", "密封阀磨损", now),
            case("江苏省", "洗车器", "滤网堵塞", now),
            case("江苏省", "吸尘器", "电池老化", now),
        ];
        let refs: Vec<&FaultDiagnosis> = history.iter().collect();

        let by_category = issue_stats(&refs, None);
        assert_eq!(by_category[0], StatCount { name: "洗车器".into(), value: 3 });
        assert_eq!(issue_stats(&refs, Some(ALL_CATEGORIES)), by_category);

        let by_issue = issue_stats(&refs, Some("洗车器"));
        assert_eq!(
            by_issue,
            vec![
                StatCount { name: "密封阀磨损".into(), value: 2 },
                StatCount { name: "滤网堵塞".into(), value: 1 },
            ]
        );
    }

    #[test]
    fn summary_counts_provinces() {
        let reference = Utc.with_ymd_and_hms(2025, 8, 14, 10, 0, 0).unwrap();
        let history = vec![
            case("江苏省", "洗车器", "a", reference),
            case("Guangdong", "洗车器", "a", reference),
            case("江苏省", "洗车器", "a", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        ];
        let summary = dashboard_summary(&history, DashboardGranularity::Month, &reference, None);
        assert_eq!(summary.total_cases, 2);
        assert_eq!(summary.province_count, 2);
        assert!(summary.region_stats.iter().any(|s| s.name == "广东省"));
    }
}
