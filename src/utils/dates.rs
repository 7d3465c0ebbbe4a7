use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_RANGE_MONTHS: u32 = 3;
const ISO_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Inclusive calendar range, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::validation(
                "la fecha final no puede ser anterior a la fecha inicial",
            ));
        }

        let limit = start
            .checked_add_months(Months::new(MAX_RANGE_MONTHS))
            .ok_or_else(|| AppError::validation("fecha inicial fuera de rango"))?;
        if end > limit {
            return Err(AppError::validation_with_details(
                format!("el rango de fechas no puede superar {MAX_RANGE_MONTHS} meses"),
                serde_json::json!({
                    "start": start.to_string(),
                    "end": end.to_string(),
                    "maxMonths": MAX_RANGE_MONTHS,
                }),
            ));
        }

        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> AppResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Whole calendar month containing `year`/`month`.
    pub fn month(year: i32, month: u32) -> AppResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::validation(format!("mes inválido: {year}-{month}")))?;
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| AppError::validation(format!("mes inválido: {year}-{month}")))?;
        Self::new(start, end)
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar day from start to end, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn working_days(&self) -> impl Iterator<Item = NaiveDate> {
        self.days().filter(|day| is_working_day(*day))
    }

    pub fn working_day_count(&self) -> usize {
        self.working_days().count()
    }
}

/// Sunday is the plant's only day off.
pub fn is_working_day(date: NaiveDate) -> bool {
    date.weekday() != Weekday::Sun
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("la fecha es obligatoria"));
    }
    NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
        .map_err(|_| AppError::validation(format!("formato de fecha inválido: {trimmed}")))
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sundays_are_not_working_days() {
        assert!(is_working_day(d(2024, 3, 4)));
        assert!(is_working_day(d(2024, 3, 9)));
        assert!(!is_working_day(d(2024, 3, 10)));
    }

    #[test]
    fn march_2024_has_26_working_days() {
        let range = DateRange::month(2024, 3).unwrap();
        assert_eq!(range.end(), d(2024, 3, 31));
        assert_eq!(range.days().count(), 31);
        assert_eq!(range.working_day_count(), 26);
        assert!(range.working_days().all(is_working_day));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::new(d(2024, 3, 5), d(2024, 3, 4)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_ranges_wider_than_three_months() {
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 4, 1)).is_ok());
        let err = DateRange::new(d(2024, 1, 1), d(2024, 5, 1)).unwrap_err();
        assert!(err.to_string().contains("3 meses"));
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_date(" 2024-03-04 ").unwrap(), d(2024, 3, 4));
        assert!(parse_date("04/03/2024").is_err());
        assert!(parse_date("").is_err());
        assert_eq!(to_display(d(2024, 3, 4)), "04/03/2024");
    }
}
