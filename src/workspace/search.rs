use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone};

use crate::models::{FaultDiagnosis, KnowledgeEntry};

/// Time filter for the history list. Boundaries are local midnights in the
/// caller's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryTimeRange {
    All,
    /// Since Monday 00:00 of the current week.
    Week,
    /// Since the 1st of the current month.
    Month,
    /// Since January 1st of the current year.
    Year,
    /// Only the given calendar day.
    Day(NaiveDate),
}

/// Records matching both the free-text query and the time range, in input order.
///
/// The query matches case-insensitively against product name, fault issue and
/// tracking number; an empty query matches everything.
pub fn filter_history<'a, Tz: TimeZone>(
    history: &'a [FaultDiagnosis],
    query: &str,
    range: HistoryTimeRange,
    now: &DateTime<Tz>,
) -> Vec<&'a FaultDiagnosis> {
    let query = query.trim().to_lowercase();
    let tz = now.timezone();
    let today = now.date_naive();

    let since = match range {
        HistoryTimeRange::All | HistoryTimeRange::Day(_) => None,
        HistoryTimeRange::Week => {
            let offset = u64::from(today.weekday().num_days_from_monday());
            today.checked_sub_days(Days::new(offset))
        }
        HistoryTimeRange::Month => today.with_day(1),
        HistoryTimeRange::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1),
    }
    .map(|date| local_midnight_millis(&tz, date));

    history
        .iter()
        .filter(|d| matches_history_query(d, &query))
        .filter(|d| match range {
            HistoryTimeRange::All => true,
            HistoryTimeRange::Day(date) => local_date(&tz, d.timestamp) == Some(date),
            _ => since.is_some_and(|start| d.timestamp >= start),
        })
        .collect()
}

fn matches_history_query(d: &FaultDiagnosis, query: &str) -> bool {
    query.is_empty()
        || d.product_name.to_lowercase().contains(query)
        || d.result.fault_issue.to_lowercase().contains(query)
        || d
            .tracking_number
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(query))
}

/// Knowledge entries whose product name, fault type or location contains `query`.
pub fn search_knowledge<'a>(knowledge: &'a [KnowledgeEntry], query: &str) -> Vec<&'a KnowledgeEntry> {
    let query = query.trim().to_lowercase();
    knowledge
        .iter()
        .filter(|e| {
            query.is_empty()
                || e.product_name.to_lowercase().contains(&query)
                || e.fault_type.to_lowercase().contains(&query)
                || e.location.to_lowercase().contains(&query)
        })
        .collect()
}

/// Milliseconds at 00:00 local time on `date`.
///
/// Where midnight does not exist (a DST gap), the earliest valid instant is
/// used; failing that, midnight UTC.
pub(crate) fn local_midnight_millis<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

pub(crate) fn local_date<Tz: TimeZone>(tz: &Tz, timestamp_ms: i64) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{DiagnosisResult, ProcessingStatus, Severity};
    use crate::workspace::seed::sample_knowledge;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn case(id: &str, product: &str, issue: &str, when: DateTime<Utc>) -> FaultDiagnosis {
        FaultDiagnosis {
            id: id.into(),
            timestamp: when.timestamp_millis(),
            product_name: product.into(),
            category: "洗车器".into(),
            description: "水压小".into(),
            source_region: "江苏省".into(),
            remark: None,
            status: ProcessingStatus::Unprocessed,
            tracking_number: None,
            image_url: None,
            result: DiagnosisResult {
                fault_issue: issue.into(),
                confidence: 0.5,
                severity: Severity::Low,
                reasoning: String::new(),
                suggested_actions: vec![],
                estimated_repair_cost: String::new(),
            },
            actual_result: None,
            feedback: None,
        }
    }

    fn ids(found: Vec<&FaultDiagnosis>) -> Vec<String> {
        found.into_iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn query_matches_product_issue_and_tracking() {
        let now = at(2025, 3, 12, 12);
        let mut tracked = case("c", "吸尘器", "电池鼓包", now);
        tracked.tracking_number = Some("SF998877".into());
        let history = vec![
            case("a", "高压洗车器", "密封阀磨损", now),
            case("b", "Air Pump", "Seal Worn", now),
            tracked,
        ];

        assert_eq!(ids(filter_history(&history, "洗车", HistoryTimeRange::All, &now)), ["a"]);
        assert_eq!(ids(filter_history(&history, "seal", HistoryTimeRange::All, &now)), ["b"]);
        assert_eq!(ids(filter_history(&history, "sf998", HistoryTimeRange::All, &now)), ["c"]);
        assert_eq!(filter_history(&history, "", HistoryTimeRange::All, &now).len(), 3);
    }

    #[test]
    fn week_starts_monday_midnight() {
        // 2025-03-12 is a Wednesday; the week starts 2025-03-10.
        let now = at(2025, 3, 12, 12);
        let history = vec![
            case("sun", "x", "y", at(2025, 3, 9, 23)),
            case("mon", "x", "y", at(2025, 3, 10, 0)),
            case("wed", "x", "y", at(2025, 3, 12, 8)),
        ];
        assert_eq!(
            ids(filter_history(&history, "", HistoryTimeRange::Week, &now)),
            ["mon", "wed"]
        );
    }

    #[test]
    fn sunday_belongs_to_the_week_before_it() {
        let now = at(2025, 3, 16, 12);
        let history = vec![
            case("prev-sun", "x", "y", at(2025, 3, 9, 12)),
            case("mon", "x", "y", at(2025, 3, 10, 12)),
        ];
        assert_eq!(ids(filter_history(&history, "", HistoryTimeRange::Week, &now)), ["mon"]);
    }

    #[test]
    fn month_and_year_ranges() {
        let now = at(2025, 3, 12, 12);
        let history = vec![
            case("last-year", "x", "y", at(2024, 12, 31, 23)),
            case("feb", "x", "y", at(2025, 2, 28, 12)),
            case("mar", "x", "y", at(2025, 3, 1, 0)),
        ];
        assert_eq!(ids(filter_history(&history, "", HistoryTimeRange::Month, &now)), ["mar"]);
        assert_eq!(
            ids(filter_history(&history, "", HistoryTimeRange::Year, &now)),
            ["feb", "mar"]
        );
    }

    #[test]
    fn day_range_matches_calendar_day() {
        let now = at(2025, 3, 12, 12);
        let day = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let history = vec![
            case("feb27", "x", "y", at(2025, 2, 27, 23)),
            case("feb28", "x", "y", at(2025, 2, 28, 1)),
        ];
        assert_eq!(
            ids(filter_history(&history, "", HistoryTimeRange::Day(day), &now)),
            ["feb28"]
        );
    }

    #[test]
    fn search_and_range_combine() {
        let now = at(2025, 3, 12, 12);
        let history = vec![
            case("old", "洗车器", "y", at(2025, 1, 1, 0)),
            case("new", "洗车器", "y", at(2025, 3, 11, 0)),
            case("other", "吸尘器", "y", at(2025, 3, 11, 0)),
        ];
        assert_eq!(
            ids(filter_history(&history, "洗车", HistoryTimeRange::Month, &now)),
            ["new"]
        );
    }

    #[test]
    fn knowledge_search_covers_location() {
        let kb = sample_knowledge();
        assert_eq!(search_knowledge(&kb, "hepa")[0].id, "kb-1");
        assert_eq!(search_knowledge(&kb, "充气")[0].id, "kb-2");
        assert_eq!(search_knowledge(&kb, "气缸")[0].id, "kb-2");
        assert_eq!(search_knowledge(&kb, "").len(), 2);
        assert!(search_knowledge(&kb, "冰箱").is_empty());
    }
}
