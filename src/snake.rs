//! snake.rs — Linha do tempo "cobra": 24 slots de uma hora com a fração coberta pelo plano.

use crate::aggregate::find_day;
use crate::format;
use crate::time::{clamp_hour, clamp_ratio, local_date, local_hour_fraction};
use crate::types::{
    OutageSegment, SegmentSource, SnakeTimelineData, SnakeTimelineSlot, SnakeTimelineSummary, Week,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub const TOTAL_SLOTS: usize = 24;
const SLOT_DURATION: f64 = 1.0;

/// Qual dia a timeline mostra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineScope {
    Today,
    Tomorrow,
}

impl TimelineScope {
    pub fn context_label(&self) -> &'static str {
        match self {
            Self::Today => "Сьогодні",
            Self::Tomorrow => "Завтра",
        }
    }
}

/// Pares `(início, fim)` dos segmentos do plano, já restritos a `[0, 24]`.
fn plan_ranges(segments: &[OutageSegment]) -> Vec<(f64, f64)> {
    segments
        .iter()
        .filter(|segment| segment.source == SegmentSource::Plan)
        .map(|segment| {
            let start = clamp_hour(segment.start_hour);
            let mut end = clamp_hour(segment.end_hour);
            if end <= start {
                end = 24.0;
            }
            (start, end)
        })
        .filter(|(start, end)| end > start)
        .collect()
}

/// Constrói os 24 slots. A cobertura de cada slot vai do menor início ao maior fim
/// das interseções com o slot.
pub fn build_snake_slots(segments: &[OutageSegment]) -> Vec<SnakeTimelineSlot> {
    let ranges = plan_ranges(segments);

    (0..TOTAL_SLOTS)
        .map(|index| {
            let start_hour = index as f64 * SLOT_DURATION;
            let end_hour = start_hour + SLOT_DURATION;

            let coverage = ranges
                .iter()
                .filter_map(|&(start, end)| {
                    let overlap_start = start.max(start_hour);
                    let overlap_end = end.min(end_hour);
                    (overlap_end > overlap_start).then_some((overlap_start, overlap_end))
                })
                .reduce(|(min_start, max_end), (start, end)| (min_start.min(start), max_end.max(end)));

            let Some((coverage_start, coverage_end)) = coverage else {
                return SnakeTimelineSlot::empty(index);
            };

            let fill_start_ratio = clamp_ratio((coverage_start - start_hour) / SLOT_DURATION);
            let fill_end_ratio = clamp_ratio((coverage_end - start_hour) / SLOT_DURATION);

            SnakeTimelineSlot {
                index,
                start_hour,
                end_hour,
                fill_ratio: clamp_ratio(fill_end_ratio - fill_start_ratio),
                fill_start_ratio,
            }
        })
        .collect()
}

/// Timeline de hoje ou de amanhã a partir da grade semanal.
pub fn resolve_snake_timeline(
    weeks: &[Week],
    now: DateTime<Utc>,
    tz: Tz,
    scope: TimelineScope,
) -> SnakeTimelineData {
    let today = local_date(now, tz);
    let target = match scope {
        TimelineScope::Today => today,
        TimelineScope::Tomorrow => today.succ_opt().unwrap_or(today),
    };
    let day = find_day(weeks, target);

    let segments = day.map(|day| day.segments.as_slice()).unwrap_or_default();
    let slots = build_snake_slots(segments);
    let has_plan_segments = !plan_ranges(segments).is_empty();

    let planned_hours = day.map_or(0.0, |day| day.planned_hours);
    let actual_hours = day.map_or(0.0, |day| day.actual_hours);
    let outage_hours = clamp_hour(actual_hours);

    SnakeTimelineData {
        slots,
        day_label: day
            .map(|day| day.title.clone())
            .unwrap_or_else(|| format::readable_day_label(target)),
        date_label: format::calendar_date(target),
        now_hour: clamp_hour(local_hour_fraction(now, tz)),
        status: day.and_then(|day| day.status.as_ref()).map(|status| status.as_str().to_string()),
        has_plan_segments,
        is_placeholder: day.is_none_or(|day| day.is_placeholder),
        current_time_label: format::clock_time(now, tz),
        summary: SnakeTimelineSummary {
            planned_hours,
            actual_hours,
            outage_hours,
            light_hours: (24.0 - outage_hours).max(0.0),
            diff_hours: planned_hours - actual_hours,
            has_actual_data: day.is_some_and(|day| day.has_actual_data()),
        },
        context_label: scope.context_label().to_string(),
        show_current_time_indicator: scope == TimelineScope::Today,
        is_future_day: scope == TimelineScope::Tomorrow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_weeks;
    use crate::normalize::NormalizedPlanDay;
    use crate::types::{DatedSegment, DayStatus, OutageType};
    use chrono::{NaiveDate, TimeZone};

    fn seg(source: SegmentSource, start: f64, end: f64) -> OutageSegment {
        OutageSegment {
            id: String::new(),
            source,
            start_hour: start,
            end_hour: end,
            kind: OutageType::Definite,
            label: String::new(),
            duration_hours: end - start,
        }
    }

    #[test]
    fn full_hours_fill_whole_slots() {
        let slots = build_snake_slots(&[seg(SegmentSource::Plan, 6.0, 9.0)]);
        assert_eq!(slots.len(), TOTAL_SLOTS);
        for slot in &slots {
            let expected = if (6..=8).contains(&slot.index) { 1.0 } else { 0.0 };
            assert_eq!(slot.fill_ratio, expected, "slot {}", slot.index);
            assert_eq!(slot.start_hour, slot.index as f64);
            assert_eq!(slot.end_hour, slot.index as f64 + 1.0);
        }
    }

    #[test]
    fn partial_hours_record_offset() {
        let slots = build_snake_slots(&[seg(SegmentSource::Plan, 6.5, 7.25)]);
        assert_eq!(slots[6].fill_start_ratio, 0.5);
        assert_eq!(slots[6].fill_ratio, 0.5);
        assert_eq!(slots[7].fill_start_ratio, 0.0);
        assert_eq!(slots[7].fill_ratio, 0.25);
    }

    #[test]
    fn overlaps_in_one_hour_use_extremities() {
        let slots = build_snake_slots(&[
            seg(SegmentSource::Plan, 10.25, 10.5),
            seg(SegmentSource::Plan, 10.75, 11.0),
        ]);
        assert_eq!(slots[10].fill_start_ratio, 0.25);
        assert_eq!(slots[10].fill_ratio, 0.75);
    }

    #[test]
    fn actual_segments_and_bad_ranges_are_ignored() {
        let slots = build_snake_slots(&[
            seg(SegmentSource::Actual, 1.0, 5.0),
            seg(SegmentSource::Plan, f64::NAN, 2.0),
        ]);
        // NaN vira 0: o plano cobre 0..2
        assert_eq!(slots[0].fill_ratio, 1.0);
        assert_eq!(slots[1].fill_ratio, 1.0);
        assert!(slots[2..].iter().all(|slot| slot.fill_ratio == 0.0));
    }

    #[test]
    fn timeline_summary_for_today_and_tomorrow() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 10, 30, 0).unwrap();
        let plan = NormalizedPlanDay {
            day: today,
            status: Some(DayStatus::ScheduleApplies),
            segments: vec![seg(SegmentSource::Plan, 6.0, 9.0)],
        };
        let actual = vec![DatedSegment {
            day: today,
            segment: seg(SegmentSource::Actual, 6.5, 8.5),
        }];
        let weeks = build_weeks(&[plan], &actual, now, Tz::UTC);

        let data = resolve_snake_timeline(&weeks, now, Tz::UTC, TimelineScope::Today);
        assert_eq!(data.day_label, "Пн (19.10)");
        assert_eq!(data.date_label, "19.10.2026");
        assert_eq!(data.now_hour, 10.5);
        assert_eq!(data.current_time_label, "10:30");
        assert_eq!(data.status.as_deref(), Some("ScheduleApplies"));
        assert!(data.has_plan_segments);
        assert!(!data.is_placeholder);
        assert_eq!(data.summary.planned_hours, 3.0);
        assert_eq!(data.summary.actual_hours, 2.0);
        assert_eq!(data.summary.light_hours, 22.0);
        assert_eq!(data.summary.diff_hours, 1.0);
        assert!(data.summary.has_actual_data);
        assert!(data.show_current_time_indicator);

        let tomorrow = resolve_snake_timeline(&weeks, now, Tz::UTC, TimelineScope::Tomorrow);
        assert!(tomorrow.is_placeholder);
        assert!(!tomorrow.has_plan_segments);
        assert!(tomorrow.is_future_day);
        assert_eq!(tomorrow.context_label, "Завтра");
        assert_eq!(tomorrow.day_label, "Вт (20.10)");
        assert!(tomorrow.slots.iter().all(|slot| slot.fill_ratio == 0.0));
    }
}
