//! aggregate.rs — Agrupa segmentos por dia e monta a grade semanal (segunda a domingo).

use crate::format;
use crate::normalize::NormalizedPlanDay;
use crate::time::{clamp_hour, local_date, local_hour_fraction, local_midnight, start_of_week};
use crate::types::{DatedSegment, DaySchedule, DayStatus, OutageSegment, SegmentSource, Week};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use tracing::debug;

/// Acumulador por dia antes de virar `DaySchedule`.
#[derive(Debug, Default)]
struct DayAccumulator {
    status: Option<DayStatus>,
    segments: Vec<OutageSegment>,
    planned_hours: f64,
    actual_hours: f64,
}

impl DayAccumulator {
    fn add(&mut self, segment: OutageSegment) {
        if segment.end_hour <= segment.start_hour {
            return;
        }
        match segment.source {
            SegmentSource::Plan => self.planned_hours += segment.duration_hours,
            SegmentSource::Actual => self.actual_hours += segment.duration_hours,
        }
        self.segments.push(segment);
    }
}

fn group_by_day(
    plan_days: &[NormalizedPlanDay],
    actual: &[DatedSegment],
) -> BTreeMap<NaiveDate, DayAccumulator> {
    let mut grouped: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for plan_day in plan_days {
        let entry = grouped.entry(plan_day.day).or_default();
        if plan_day.status.is_some() {
            entry.status = plan_day.status.clone();
        }
        for segment in &plan_day.segments {
            entry.add(segment.clone());
        }
    }

    for dated in actual {
        grouped
            .entry(dated.day)
            .or_default()
            .add(dated.segment.clone());
    }

    grouped
}

fn build_day(
    day: NaiveDate,
    accumulator: Option<DayAccumulator>,
    today: NaiveDate,
    now_hour: f64,
    tz: Tz,
) -> DaySchedule {
    let now_hour = (day == today).then_some(now_hour);
    let base = DaySchedule {
        key: day,
        title: format::day_title(day),
        date_iso: local_midnight(day, tz),
        status: None,
        planned_hours: 0.0,
        actual_hours: 0.0,
        segments: Vec::new(),
        now_hour,
        is_placeholder: true,
    };

    let Some(mut accumulator) = accumulator else {
        return base;
    };

    accumulator
        .segments
        .sort_by(|left, right| left.start_hour.total_cmp(&right.start_hour));
    let is_placeholder = accumulator.segments.is_empty();

    DaySchedule {
        status: accumulator.status,
        planned_hours: if is_placeholder { 0.0 } else { accumulator.planned_hours },
        actual_hours: if is_placeholder { 0.0 } else { accumulator.actual_hours },
        segments: accumulator.segments,
        is_placeholder,
        ..base
    }
}

/// Monta as semanas cobrindo `[min(datas), max(datas)]` e sempre a semana de `now`.
/// Dias sem dados viram placeholders; cada semana tem exatamente sete dias.
pub fn build_weeks(
    plan_days: &[NormalizedPlanDay],
    actual: &[DatedSegment],
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<Week> {
    let mut grouped = group_by_day(plan_days, actual);

    let today = local_date(now, tz);
    let now_hour = clamp_hour(local_hour_fraction(now, tz));
    let current_week = start_of_week(today);

    let first_week = grouped
        .keys()
        .next()
        .map(|&first| start_of_week(first).min(current_week))
        .unwrap_or(current_week);
    let last_week = grouped
        .keys()
        .next_back()
        .map(|&last| start_of_week(last).max(current_week))
        .unwrap_or(current_week);

    let mut weeks = Vec::new();
    let mut cursor = first_week;
    while cursor <= last_week {
        let week_end = cursor + Duration::days(6);
        let days: Vec<DaySchedule> = cursor
            .iter_days()
            .take(7)
            .map(|day| build_day(day, grouped.remove(&day), today, now_hour, tz))
            .collect();

        weeks.push(Week {
            id: cursor,
            start_iso: local_midnight(cursor, tz),
            end_iso: local_midnight(week_end, tz),
            range_label: format::week_range(cursor, week_end),
            days,
        });
        cursor += Duration::days(7);
    }

    debug!(
        "Grade montada: {} semana(s) de {} a {}",
        weeks.len(),
        first_week,
        last_week
    );
    weeks
}

/// Procura o dia `key` na grade.
pub fn find_day(weeks: &[Week], key: NaiveDate) -> Option<&DaySchedule> {
    all_days(weeks).find(|day| day.key == key)
}

pub fn all_days(weeks: &[Week]) -> impl Iterator<Item = &DaySchedule> {
    weeks.iter().flat_map(|week| week.days.iter())
}
