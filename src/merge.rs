//! merge.rs — Fusão de intervalos do plano (no mesmo dia e através da meia-noite).
//!
//! Só segmentos de origem `plan` entram aqui; as faltas reais são resumidas pelo
//! resolvedor de status.

use crate::aggregate::find_day;
use crate::time::{at_hour, local_date};
use crate::types::{DaySchedule, MergedPlanInterval, PlanSummary, Week};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// Lacuna máxima entre dois intervalos para considerá-los contínuos entre dias.
pub const CROSS_DAY_TOLERANCE: Duration = Duration::minutes(1);

/// Segmentos de amanhã que começam antes desta hora entram no resumo de hoje.
pub const NEXT_DAY_CARRY_OVER_HOUR: f64 = 6.0;

fn merge_with_tolerance(
    intervals: &[MergedPlanInterval],
    tolerance: Duration,
) -> Vec<MergedPlanInterval> {
    let mut sorted: Vec<MergedPlanInterval> = intervals
        .iter()
        .filter(|interval| interval.end > interval.start)
        .copied()
        .collect();
    sorted.sort_by_key(|interval| interval.start);

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        match merged.last_mut() {
            Some((_, last_end)) if interval.start <= *last_end + tolerance => {
                if interval.end > *last_end {
                    *last_end = interval.end;
                }
            }
            _ => merged.push((interval.start, interval.end)),
        }
    }

    merged
        .into_iter()
        .map(|(start, end)| MergedPlanInterval::new(start, end))
        .collect()
}

/// Funde intervalos sobrepostos ou adjacentes (início <= fim corrente), sem tolerância.
pub fn merge_continuous_segments(intervals: &[MergedPlanInterval]) -> Vec<MergedPlanInterval> {
    merge_with_tolerance(intervals, Duration::zero())
}

/// Como `merge_continuous_segments`, mas também funde lacunas de até um minuto.
pub fn merge_across_days(intervals: &[MergedPlanInterval]) -> Vec<MergedPlanInterval> {
    merge_with_tolerance(intervals, CROSS_DAY_TOLERANCE)
}

/// Intervalos absolutos do plano de um dia, a partir das frações de hora.
/// Fim anterior ao início é empurrado para o dia seguinte.
pub fn day_plan_intervals(day: &DaySchedule, tz: Tz) -> Vec<MergedPlanInterval> {
    day.plan_segments()
        .filter_map(|segment| {
            let start = at_hour(day.key, segment.start_hour, tz)?;
            let mut end = at_hour(day.key, segment.end_hour, tz)?;
            if end <= start {
                end += Duration::days(1);
            }
            Some(MergedPlanInterval::new(start, end))
        })
        .collect()
}

/// Todos os intervalos do plano da grade, fundidos através dos dias.
/// O fim de cada segmento vem da duração original (não do `end_hour` truncado em 24).
pub fn collect_plan_intervals(weeks: &[Week], tz: Tz) -> Vec<MergedPlanInterval> {
    let intervals: Vec<MergedPlanInterval> = weeks
        .iter()
        .flat_map(|week| week.days.iter())
        .filter(|day| !day.is_placeholder)
        .flat_map(|day| {
            day.plan_segments().filter_map(move |segment| {
                let start = at_hour(day.key, segment.start_hour, tz)?;
                let minutes = ((segment.duration_hours * 60.0).round() as i64).max(1);
                let end = start + Duration::try_minutes(minutes)?;
                Some(MergedPlanInterval::new(start, end))
            })
        })
        .collect();

    merge_across_days(&intervals)
}

/// Resumo do plano de hoje: segmentos de hoje mais os de amanhã até as 06:00,
/// fundidos para que uma falta que atravessa a meia-noite apareça como um bloco só.
pub fn resolve_plan_summary(weeks: &[Week], now: DateTime<Utc>, tz: Tz) -> Option<PlanSummary> {
    let today = local_date(now, tz);
    let current_day = find_day(weeks, today);
    let next_day = today.succ_opt().and_then(|tomorrow| find_day(weeks, tomorrow));

    if current_day.is_some_and(DaySchedule::is_emergency) {
        return Some(PlanSummary::Emergency);
    }

    let has_data = |day: Option<&DaySchedule>| day.is_some_and(|day| !day.is_placeholder);
    if !has_data(current_day) && !has_data(next_day) {
        return None;
    }

    let mut intervals = Vec::new();
    if let Some(day) = current_day.filter(|day| !day.is_placeholder) {
        intervals.extend(day_plan_intervals(day, tz));
    }
    if let Some(day) = next_day.filter(|day| !day.is_placeholder) {
        intervals.extend(
            day.plan_segments()
                .filter(|segment| segment.start_hour < NEXT_DAY_CARRY_OVER_HOUR)
                .filter_map(|segment| {
                    let start = at_hour(day.key, segment.start_hour, tz)?;
                    let end = at_hour(day.key, segment.end_hour, tz)?;
                    (end > start).then(|| MergedPlanInterval::new(start, end))
                }),
        );
    }

    let segments = merge_continuous_segments(&intervals);
    if segments.is_empty() {
        return None;
    }

    let current = segments.iter().find(|segment| segment.contains(now)).copied();
    let next = segments.iter().find(|segment| segment.start > now).copied();

    Some(PlanSummary::Normal {
        segments,
        current,
        next,
    })
}
