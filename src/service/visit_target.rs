use crate::models::{PeriodType, PeriodWindow, VisitLog, VisitTargetError, VisitTargetRow};
use chrono::{Datelike, Days, NaiveDate};

/// 根据周期类型推导起止日期及是否只读。
/// 自定义区间保留行上已有日期；未指定则清空并允许编辑。
pub fn derive_period(
    period: Option<PeriodType>,
    today: NaiveDate,
    row_start: Option<NaiveDate>,
    row_end: Option<NaiveDate>,
) -> Result<PeriodWindow, VisitTargetError> {
    let out_of_range = || VisitTargetError::DateOutOfRange(today);

    let window = match period {
        Some(PeriodType::CurrentMonth) => {
            let start = today.with_day(1).ok_or_else(out_of_range)?;
            let end = last_day_before(next_month_start(start)).ok_or_else(out_of_range)?;
            fixed(start, end)
        }
        Some(PeriodType::CurrentQuarter) => {
            let first_month = (today.month0() / 3) * 3 + 1;
            let start = NaiveDate::from_ymd_opt(today.year(), first_month, 1).ok_or_else(out_of_range)?;
            let next_quarter = start
                .checked_add_months(chrono::Months::new(3))
                .ok_or_else(out_of_range)?;
            let end = last_day_before(Some(next_quarter)).ok_or_else(out_of_range)?;
            fixed(start, end)
        }
        Some(PeriodType::Next30Days) => {
            let end = today.checked_add_days(Days::new(30)).ok_or_else(out_of_range)?;
            fixed(today, end)
        }
        Some(PeriodType::CustomRange) => PeriodWindow {
            start_date: row_start,
            end_date: row_end,
            read_only: false,
        },
        None => PeriodWindow {
            start_date: None,
            end_date: None,
            read_only: false,
        },
    };

    Ok(window)
}

/// 校验行并回填推导出的日期
pub fn apply_period(
    row: &mut VisitTargetRow,
    today: NaiveDate,
) -> Result<PeriodWindow, VisitTargetError> {
    row.validate()?;
    let period = row.period_type.as_deref().and_then(PeriodType::from_label);
    let window = derive_period(period, today, row.start_date, row.end_date)?;
    row.apply(&window);
    Ok(window)
}

/// 拜访计数: 找到第一个客户一致且日期区间覆盖拜访日期的行，完成次数加一。
/// 返回被更新行的下标；没有匹配行时返回 None。
pub fn record_visit(
    rows: &mut [VisitTargetRow],
    customer: &str,
    visit_date: NaiveDate,
) -> Option<usize> {
    let idx = rows.iter().position(|row| row.covers(customer, visit_date))?;
    rows[idx].completed_visits += 1;
    Some(idx)
}

/// 处理一条已提交的拜访记录
pub fn record_visit_log(
    rows: &mut [VisitTargetRow],
    log: &VisitLog,
) -> Result<Option<usize>, VisitTargetError> {
    let (visit_date, customer) = log.validate()?;
    let matched = record_visit(rows, customer, visit_date);
    match matched {
        Some(idx) => tracing::info!(
            "Incremented completed_visits for SP {}, Customer {}, Row {}",
            log.sales_person.as_deref().unwrap_or_default(), customer, idx + 1
        ),
        None => tracing::warn!(
            "No matching Visit Target found for Sales Visit Log {} (Customer: {}, Date: {})",
            log.name.as_deref().unwrap_or_default(), customer, visit_date
        ),
    }
    Ok(matched)
}

fn fixed(start: NaiveDate, end: NaiveDate) -> PeriodWindow {
    PeriodWindow {
        start_date: Some(start),
        end_date: Some(end),
        read_only: true,
    }
}

fn next_month_start(month_start: NaiveDate) -> Option<NaiveDate> {
    month_start.checked_add_months(chrono::Months::new(1))
}

fn last_day_before(date: Option<NaiveDate>) -> Option<NaiveDate> {
    date?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn target(customer: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> VisitTargetRow {
        VisitTargetRow {
            customer: Some(customer.to_string()),
            start_date: start,
            end_date: end,
            ..Default::default()
        }
    }

    #[test]
    fn visit_on_range_boundaries_is_counted() {
        let mut rows = vec![target("CUST-1", Some(date(2025, 4, 1)), Some(date(2025, 4, 30)))];

        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 4, 1)), Some(0));
        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 4, 30)), Some(0));
        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 5, 1)), None);
        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 3, 31)), None);
        assert_eq!(rows[0].completed_visits, 2);
    }

    #[test]
    fn rows_without_dates_never_match() {
        let mut rows = vec![
            target("CUST-1", None, Some(date(2025, 4, 30))),
            target("CUST-1", Some(date(2025, 4, 1)), None),
            target("CUST-1", None, None),
        ];
        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 4, 10)), None);
        assert!(rows.iter().all(|r| r.completed_visits == 0));
    }

    #[test]
    fn only_first_matching_row_is_incremented() {
        let mut rows = vec![
            target("CUST-2", Some(date(2025, 1, 1)), Some(date(2025, 12, 31))),
            target("CUST-1", Some(date(2025, 4, 1)), Some(date(2025, 6, 30))),
            target("CUST-1", Some(date(2025, 1, 1)), Some(date(2025, 12, 31))),
        ];
        rows[1].completed_visits = 4;

        assert_eq!(record_visit(&mut rows, "CUST-1", date(2025, 5, 5)), Some(1));
        assert_eq!(rows[0].completed_visits, 0);
        assert_eq!(rows[1].completed_visits, 5);
        assert_eq!(rows[2].completed_visits, 0);
    }

    #[test]
    fn incomplete_visit_log_is_rejected() {
        let mut rows = vec![target("CUST-1", Some(date(2025, 4, 1)), Some(date(2025, 4, 30)))];
        let log = VisitLog {
            name: Some("SVL-0007".into()),
            sales_person: None,
            visit_date: Some(date(2025, 4, 2)),
            customer: Some("CUST-1".into()),
        };
        assert_eq!(
            record_visit_log(&mut rows, &log),
            Err(VisitTargetError::IncompleteVisitLog("SVL-0007".into()))
        );

        let log = VisitLog { sales_person: Some("SP-1".into()), ..log };
        assert_eq!(record_visit_log(&mut rows, &log), Ok(Some(0)));
        assert_eq!(rows[0].completed_visits, 1);
    }

    #[test]
    fn row_check_reports_first_incomplete_row() {
        let rows = vec![
            target("CUST-1", None, None),
            VisitTargetRow { territory: Some("Sfax".into()), ..Default::default() },
            VisitTargetRow::default(),
            VisitTargetRow::default(),
        ];
        assert_eq!(
            crate::models::validate_rows(&rows),
            Err(VisitTargetError::MissingCustomerOrTerritoryAt(3))
        );
        assert_eq!(crate::models::validate_rows(&rows[..2]), Ok(()));
    }

    #[test]
    fn current_month_covers_whole_month() {
        let window = derive_period(Some(PeriodType::CurrentMonth), date(2024, 2, 14), None, None).unwrap();
        assert_eq!(window.start_date, Some(date(2024, 2, 1)));
        assert_eq!(window.end_date, Some(date(2024, 2, 29)));
        assert!(window.read_only);

        let december = derive_period(Some(PeriodType::CurrentMonth), date(2025, 12, 31), None, None).unwrap();
        assert_eq!(december.end_date, Some(date(2025, 12, 31)));
    }

    #[test]
    fn current_quarter_ends_on_last_calendar_day() {
        let q3 = derive_period(Some(PeriodType::CurrentQuarter), date(2025, 8, 20), None, None).unwrap();
        assert_eq!(q3.start_date, Some(date(2025, 7, 1)));
        assert_eq!(q3.end_date, Some(date(2025, 9, 30)));

        let q4 = derive_period(Some(PeriodType::CurrentQuarter), date(2025, 10, 1), None, None).unwrap();
        assert_eq!(q4.start_date, Some(date(2025, 10, 1)));
        assert_eq!(q4.end_date, Some(date(2025, 12, 31)));
    }

    #[test]
    fn next_thirty_days_starts_today() {
        let window = derive_period(Some(PeriodType::Next30Days), date(2025, 1, 15), None, None).unwrap();
        assert_eq!(window.start_date, Some(date(2025, 1, 15)));
        assert_eq!(window.end_date, Some(date(2025, 2, 14)));
        assert!(window.read_only);
    }

    #[test]
    fn custom_range_keeps_row_dates_editable() {
        let start = Some(date(2025, 3, 3));
        let window = derive_period(Some(PeriodType::CustomRange), date(2025, 1, 1), start, None).unwrap();
        assert_eq!(window.start_date, start);
        assert_eq!(window.end_date, None);
        assert!(!window.read_only);
    }

    #[test]
    fn unknown_period_clears_dates() {
        let mut row = VisitTargetRow {
            territory: Some("Tunis".into()),
            period_type: Some("Fortnight".into()),
            start_date: Some(date(2025, 1, 1)),
            end_date: Some(date(2025, 1, 31)),
            ..Default::default()
        };
        let window = apply_period(&mut row, date(2025, 6, 1)).unwrap();
        assert!(!window.read_only);
        assert_eq!(row.start_date, None);
        assert_eq!(row.end_date, None);
    }

    #[test]
    fn row_needs_customer_or_territory() {
        let mut row = VisitTargetRow {
            customer: Some("  ".into()),
            period_type: Some("Current Month".into()),
            ..Default::default()
        };
        assert_eq!(
            apply_period(&mut row, date(2025, 6, 1)),
            Err(VisitTargetError::MissingCustomerOrTerritory)
        );

        row.customer = Some("CUST-001".into());
        let window = apply_period(&mut row, date(2025, 6, 10)).unwrap();
        assert_eq!(row.start_date, Some(date(2025, 6, 1)));
        assert_eq!(row.end_date, window.end_date);
    }
}
