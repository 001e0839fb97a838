//! Day grids for the meal planner.
//!
//! Everything here is pure date arithmetic: the same inputs always produce
//! the same sequence, and nothing can fail for dates inside the supported
//! calendar range.

use std::fmt::Write as _;

use bitflags::bitflags;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use time::format_description::{self, FormatItem};
use time::{Date, Duration, Month, OffsetDateTime, Weekday};

/// Six full weeks.
pub const GRID_DAYS: usize = 42;

static ISO_DATE: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[year]-[month]-[day]").expect("valid date format description")
});

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum WeekStart {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Monday,
            WeekStart::Tuesday => Weekday::Tuesday,
            WeekStart::Wednesday => Weekday::Wednesday,
            WeekStart::Thursday => Weekday::Thursday,
            WeekStart::Friday => Weekday::Friday,
            WeekStart::Saturday => Weekday::Saturday,
            WeekStart::Sunday => Weekday::Sunday,
        }
    }

    /// Column order for a week header.
    pub fn columns(self) -> [Weekday; 7] {
        let mut day = self.weekday();
        let mut columns = [day; 7];
        for slot in columns.iter_mut().skip(1) {
            day = day.next();
            *slot = day;
        }
        columns
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DayFlags: u8 {
        /// Belongs to the month (or, for week strips, today's month) being shown.
        const IN_MONTH = 1;
        const TODAY = 1 << 1;
        /// First day of its calendar month.
        const MONTH_START = 1 << 2;
        /// Last day of its calendar month.
        const MONTH_END = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: Date,
    pub flags: DayFlags,
}

impl CalendarDay {
    fn new(date: Date, year: i32, month: Month, today: Date) -> Self {
        let mut flags = DayFlags::empty();
        flags.set(
            DayFlags::IN_MONTH,
            date.year() == year && date.month() == month,
        );
        flags.set(DayFlags::TODAY, date == today);
        flags.set(DayFlags::MONTH_START, date.day() == 1);
        flags.set(
            DayFlags::MONTH_END,
            date.next_day()
                .map(|next| next.month() != date.month())
                .unwrap_or(true),
        );
        Self { date, flags }
    }

    pub fn in_month(&self) -> bool {
        self.flags.contains(DayFlags::IN_MONTH)
    }

    pub fn is_today(&self) -> bool {
        self.flags.contains(DayFlags::TODAY)
    }

    pub fn is_month_boundary(&self) -> bool {
        self.flags
            .intersects(DayFlags::MONTH_START | DayFlags::MONTH_END)
    }

    /// Short month name, shown next to the first day of a month.
    pub fn month_label(&self) -> Option<String> {
        if self.flags.contains(DayFlags::MONTH_START) {
            Some(short_month(self.date.month()))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: Month,
    pub today: Date,
    pub week_start: WeekStart,
    pub days: [CalendarDay; GRID_DAYS],
}

impl MonthGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }

    /// The grid `delta` months away, keeping today and the week start.
    pub fn shift(&self, delta: i32) -> MonthGrid {
        let (year, month) = add_months(self.year, self.month, delta);
        month_grid(year, month, self.today, self.week_start)
    }

    pub fn days_in_month(&self) -> usize {
        self.days.iter().filter(|day| day.in_month()).count()
    }

    pub fn position_of(&self, date: Date) -> Option<usize> {
        self.days.iter().position(|day| day.date == date)
    }
}

pub fn month_grid(year: i32, month: Month, today: Date, week_start: WeekStart) -> MonthGrid {
    let first = first_of_month(year, month);
    let lead = (i64::from(first.weekday().number_days_from_monday()) + 7
        - i64::from(week_start.weekday().number_days_from_monday()))
        % 7;
    let start = first.saturating_sub(Duration::days(lead));
    let (year, month) = (first.year(), first.month());
    let days = std::array::from_fn(|idx| {
        let date = start.saturating_add(Duration::days(idx as i64));
        CalendarDay::new(date, year, month, today)
    });
    MonthGrid {
        year,
        month,
        today,
        week_start,
        days,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekStrip {
    pub today: Date,
    pub days: Vec<CalendarDay>,
}

impl WeekStrip {
    /// Days grouped by (year, month) in display order, for month labels.
    pub fn by_month(&self) -> IndexMap<(i32, Month), Vec<CalendarDay>> {
        let mut groups: IndexMap<(i32, Month), Vec<CalendarDay>> = IndexMap::new();
        for day in &self.days {
            groups
                .entry((day.date.year(), day.date.month()))
                .or_default()
                .push(*day);
        }
        groups
    }
}

/// A contiguous strip from `days_before` days before today through
/// `days_after` days after it.
pub fn week_strip(today: Date, days_before: u8, days_after: u8) -> WeekStrip {
    week_strip_around(today, today, days_before, days_after)
}

/// Same span centred on `anchor`. `IN_MONTH` follows the anchor's month and
/// `TODAY` stays on the real `today`, which may fall outside the strip.
pub fn week_strip_around(anchor: Date, today: Date, days_before: u8, days_after: u8) -> WeekStrip {
    let start = anchor.saturating_sub(Duration::days(i64::from(days_before)));
    let len = usize::from(days_before) + usize::from(days_after) + 1;
    let days = (0..len)
        .map(|idx| {
            let date = start.saturating_add(Duration::days(idx as i64));
            CalendarDay::new(date, anchor.year(), anchor.month(), today)
        })
        .collect();
    WeekStrip { today, days }
}

pub fn add_months(year: i32, month: Month, delta: i32) -> (i32, Month) {
    let index = year * 12 + (month as i32 - 1) + delta;
    let year = index.div_euclid(12);
    let month_number = (index.rem_euclid(12) + 1) as u8;
    let month = Month::try_from(month_number).unwrap_or(Month::January);
    (year, month)
}

pub fn today_local() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

pub fn parse_iso_date(input: &str) -> Option<Date> {
    Date::parse(input.trim(), &*ISO_DATE).ok()
}

pub fn format_iso_date(date: Date) -> String {
    date.format(&*ISO_DATE)
        .unwrap_or_else(|_| date.to_string())
}

pub fn short_month(month: Month) -> String {
    month.to_string().chars().take(3).collect()
}

pub fn short_weekday(day: Weekday) -> String {
    day.to_string().chars().take(2).collect()
}

/// Plain-text month view: `[dd]` marks today, `(dd)` days of the
/// neighbouring months.
pub fn render_month(grid: &MonthGrid) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", grid.month, grid.year);
    let header: String = grid
        .week_start
        .columns()
        .iter()
        .map(|day| format!(" {} ", short_weekday(*day)))
        .collect();
    out.push_str(header.trim_end());
    for week in grid.weeks() {
        out.push('\n');
        let line: String = week.iter().map(render_cell).collect();
        out.push_str(line.trim_end());
    }
    out
}

fn render_cell(day: &CalendarDay) -> String {
    let number = day.date.day();
    if day.is_today() {
        format!("[{number:>2}]")
    } else if day.in_month() {
        format!(" {number:>2} ")
    } else {
        format!("({number:>2})")
    }
}

fn first_of_month(year: i32, month: Month) -> Date {
    let year = year.clamp(Date::MIN.year(), Date::MAX.year());
    Date::from_calendar_date(year, month, 1).unwrap_or(Date::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;
    use time::macros::date;

    #[test]
    fn every_month_has_42_days_and_full_in_month_run() {
        let today = date!(2024 - 06 - 15);
        for year in [2023, 2024, 2025, 2100] {
            for number in 1..=12u8 {
                let month = Month::try_from(number).expect("month");
                let grid = month_grid(year, month, today, WeekStart::Monday);
                assert_eq!(grid.days.len(), GRID_DAYS);
                assert_eq!(
                    grid.days_in_month(),
                    usize::from(time::util::days_in_year_month(year, month)),
                    "{month} {year}"
                );
            }
        }
    }

    #[test]
    fn grid_starts_on_configured_first_day() {
        let today = date!(2026 - 10 - 16);
        for start in WeekStart::iter() {
            for number in 1..=12u8 {
                let month = Month::try_from(number).expect("month");
                let grid = month_grid(2026, month, today, start);
                assert_eq!(grid.days[0].date.weekday(), start.weekday());
                assert!(grid.days[0].date <= first_of_month(2026, month));
            }
        }
    }

    #[test]
    fn grid_days_are_contiguous() {
        let grid = month_grid(2024, Month::February, date!(2024 - 02 - 29), WeekStart::Sunday);
        for pair in grid.days.windows(2) {
            assert_eq!(pair[0].date.next_day(), Some(pair[1].date));
        }
        assert_eq!(grid.days_in_month(), 29);
    }

    #[test]
    fn flags_today_and_month_boundaries() {
        let today = date!(2026 - 02 - 14);
        let grid = month_grid(2026, Month::February, today, WeekStart::Monday);
        let todays: Vec<_> = grid.days.iter().filter(|day| day.is_today()).collect();
        assert_eq!(todays.len(), 1);
        assert_eq!(todays[0].date, today);

        let jan_end = grid.days[5];
        assert_eq!(jan_end.date, date!(2026 - 01 - 31));
        assert!(jan_end.flags.contains(DayFlags::MONTH_END));
        assert!(!jan_end.in_month());

        let feb_first = grid.days[6];
        assert!(feb_first.flags.contains(DayFlags::MONTH_START | DayFlags::IN_MONTH));
        assert_eq!(feb_first.month_label().as_deref(), Some("Feb"));

        let mar_first = grid.position_of(date!(2026 - 03 - 01)).expect("march 1 visible");
        assert_eq!(grid.days[mar_first].month_label().as_deref(), Some("Mar"));
        assert!(grid.days[mar_first - 1].is_month_boundary());
    }

    #[test]
    fn shifting_wraps_across_years() {
        let grid = month_grid(2025, Month::December, date!(2025 - 12 - 01), WeekStart::Monday);
        let next = grid.shift(1);
        assert_eq!((next.year, next.month), (2026, Month::January));
        let back = next.shift(-13);
        assert_eq!((back.year, back.month), (2024, Month::December));
        assert_eq!(next.today, grid.today);
    }

    #[test]
    fn week_strip_around_keeps_today_flag_on_real_today() {
        let today = date!(2026 - 03 - 02);
        let strip = week_strip_around(date!(2026 - 03 - 10), today, 4, 2);
        assert_eq!(strip.days.first().map(|day| day.date), Some(date!(2026 - 03 - 06)));
        assert_eq!(strip.days.last().map(|day| day.date), Some(date!(2026 - 03 - 12)));
        assert!(strip.days.iter().all(|day| !day.is_today()));
        assert!(strip.days.iter().all(CalendarDay::in_month));

        let covering = week_strip_around(date!(2026 - 03 - 04), today, 4, 2);
        let flagged: Vec<Date> = covering
            .days
            .iter()
            .filter(|day| day.is_today())
            .map(|day| day.date)
            .collect();
        assert_eq!(flagged, vec![today]);
    }

    #[test]
    fn week_strip_spans_before_and_after_today() {
        let today = date!(2026 - 03 - 02);
        let strip = week_strip(today, 4, 2);
        assert_eq!(strip.days.len(), 7);
        assert_eq!(strip.days[0].date, date!(2026 - 02 - 26));
        assert_eq!(strip.days[4].date, today);
        assert!(strip.days[4].is_today());
        assert_eq!(strip.days[6].date, date!(2026 - 03 - 04));

        let groups = strip.by_month();
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![(2026, Month::February), (2026, Month::March)]);
        assert_eq!(groups[&(2026, Month::February)].len(), 3);
        assert!(groups[&(2026, Month::February)]
            .iter()
            .all(|day| !day.in_month()));
    }

    #[test]
    fn iso_dates_round_trip() {
        let parsed = parse_iso_date("2026-10-16").expect("date");
        assert_eq!(parsed, date!(2026 - 10 - 16));
        assert_eq!(format_iso_date(parsed), "2026-10-16");
        assert!(parse_iso_date("16/10/2026").is_none());
    }

    #[test]
    fn renders_month_as_text() {
        let grid = month_grid(2026, Month::February, date!(2026 - 02 - 14), WeekStart::Monday);
        insta::assert_snapshot!(render_month(&grid), @r###"
        February 2026
         Mo  Tu  We  Th  Fr  Sa  Su
        (26)(27)(28)(29)(30)(31)  1
          2   3   4   5   6   7   8
          9  10  11  12  13 [14] 15
         16  17  18  19  20  21  22
         23  24  25  26  27  28 ( 1)
        ( 2)( 3)( 4)( 5)( 6)( 7)( 8)
        "###);
    }
}
