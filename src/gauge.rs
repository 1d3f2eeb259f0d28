//! gauge.rs — Estado do anel de progresso (contagem até a volta ou até a próxima falta).
//!
//! A ordem de decisão importa: cada ramo é terminal.

use crate::aggregate::find_day;
use crate::format;
use crate::merge::collect_plan_intervals;
use crate::time::{local_date, minutes_between};
use crate::types::{
    GaugeCaptions, GaugeProgress, GaugeVisualState, MergedPlanInterval, PowerStatus, Tone, Week,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Janela do plano só é considerada confiável depois desta fração decorrida.
pub const EARLY_WINDOW_RATIO: f64 = 0.5;

const TOP_UNTIL_RESTORE: &str = "До відновлення";
const TOP_UNTIL_OUTAGE: &str = "До відключення";
const UNKNOWN: &str = "невідомо";

fn captions(top: &str, primary: impl Into<String>) -> GaugeCaptions {
    GaugeCaptions {
        top_label: top.to_string(),
        primary_label: primary.into(),
        secondary_label: None,
        footnote: None,
    }
}

fn countdown_label(remaining_minutes: f64, fallback: &str) -> String {
    if remaining_minutes > 0.0 {
        format!("~{}", format::duration(remaining_minutes))
    } else {
        fallback.to_string()
    }
}

fn emergency_state() -> GaugeVisualState {
    GaugeVisualState::None {
        captions: GaugeCaptions {
            top_label: "ГРАФІК НЕ ДІЄ".to_string(),
            primary_label: "⚠️⚠️⚠️".to_string(),
            secondary_label: Some("Діють екстрені відключення.".to_string()),
            footnote: Some("Слідкуйте за оновленнями.".to_string()),
        },
    }
}

/// Falta em curso: conta até o fim do plano ativo, ou fica em "невідомо" sem plano.
fn outage_state(
    status: &PowerStatus,
    active_plan: Option<&MergedPlanInterval>,
    now: DateTime<Utc>,
) -> GaugeVisualState {
    let start = status
        .since_iso
        .or(active_plan.map(|plan| plan.start))
        .unwrap_or(now);
    let elapsed = minutes_between(start, now);

    match active_plan {
        Some(plan) => {
            let remaining = minutes_between(now, plan.end);
            let total = minutes_between(start, plan.end).max(elapsed);
            GaugeVisualState::Outage {
                progress: GaugeProgress::new(elapsed, remaining, total, true),
                captions: captions(TOP_UNTIL_RESTORE, countdown_label(remaining, "ще трішки")),
            }
        }
        None => GaugeVisualState::Outage {
            progress: GaugeProgress::new(elapsed, 0.0, elapsed, false),
            captions: captions(TOP_UNTIL_RESTORE, "Поки невідомо"),
        },
    }
}

pub fn resolve_gauge_state(
    weeks: &[Week],
    status: &PowerStatus,
    now: DateTime<Utc>,
    tz: Tz,
) -> GaugeVisualState {
    let today = local_date(now, tz);
    if find_day(weeks, today).is_some_and(|day| day.is_emergency()) {
        return emergency_state();
    }

    let plans = collect_plan_intervals(weeks, tz);
    let active_plan = plans.iter().find(|plan| plan.contains(now));
    let previous_plan = plans.iter().rev().find(|plan| plan.end <= now);
    let mut next_plan = plans.iter().find(|plan| plan.start > now);

    if status.tone == Tone::Warning {
        return outage_state(status, active_plan, now);
    }

    if let Some(active) = active_plan {
        let total = minutes_between(active.start, active.end).max(1.0);
        let elapsed = minutes_between(active.start, now).min(total);

        if elapsed < total * EARLY_WINDOW_RATIO {
            debug!(
                "Janela do plano recém-iniciada ({:.0}/{:.0} min), sem contagem",
                elapsed, total
            );
            let mut early = captions(TOP_UNTIL_OUTAGE, UNKNOWN);
            early.secondary_label = Some(format!(
                "Планове вікно {} ще триває.",
                format::time_range(active.start, active.end, tz)
            ));
            early.footnote = Some("Може зникнути будь-якої миті.".to_string());
            return GaugeVisualState::None { captions: early };
        }

        next_plan = plans
            .iter()
            .find(|plan| plan.start >= active.end)
            .or(next_plan);
    }

    let Some(next) = next_plan else {
        let mut unknown = captions(TOP_UNTIL_OUTAGE, UNKNOWN);
        unknown.secondary_label = previous_plan.map(|plan| {
            format!(
                "Останній графік завершився {}",
                format::short_date_time(plan.end, now, tz)
            )
        });
        unknown.footnote = Some("Графік на майбутні дні відсутній".to_string());
        return GaugeVisualState::None { captions: unknown };
    };

    let uptime_start = [status.since_iso, previous_plan.map(|plan| plan.end)]
        .into_iter()
        .flatten()
        .find(|candidate| *candidate <= now)
        .or_else(|| (next.end > now).then_some(now));

    let until_next = minutes_between(now, next.start);
    let total = match uptime_start {
        Some(start) => {
            let computed = minutes_between(start, next.start);
            if computed > 0.0 { computed } else { until_next.max(1.0) }
        }
        None => until_next.max(1.0),
    };
    let remaining = until_next;
    let completed = (total - remaining).max(0.0);

    let mut uptime = captions(TOP_UNTIL_OUTAGE, countdown_label(remaining, "ще трохи"));
    if completed > 0.0 {
        uptime.secondary_label = Some(format!("Світло є вже {}", format::duration(completed)));
    }

    GaugeVisualState::Uptime {
        progress: GaugeProgress::new(completed, remaining, total, true),
        captions: uptime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::build_weeks;
    use crate::normalize::NormalizedPlanDay;
    use crate::types::{DayStatus, OutageSegment, OutageType, SegmentSource};
    use chrono::{NaiveDate, TimeZone};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    fn plan(d: u32, ranges: &[(f64, f64)]) -> NormalizedPlanDay {
        NormalizedPlanDay {
            day: NaiveDate::from_ymd_opt(2026, 10, d).unwrap(),
            status: Some(DayStatus::ScheduleApplies),
            segments: ranges
                .iter()
                .enumerate()
                .map(|(i, &(start, end))| OutageSegment {
                    id: format!("{d}-{i}-plan"),
                    source: SegmentSource::Plan,
                    start_hour: start,
                    end_hour: end,
                    kind: OutageType::Definite,
                    label: String::new(),
                    duration_hours: end - start,
                })
                .collect(),
        }
    }

    fn status(tone: Tone, since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PowerStatus {
        PowerStatus {
            tone,
            since_iso: since,
            current_iso: now,
            title: String::new(),
            subtitle: String::new(),
            elapsed_label: None,
        }
    }

    fn weeks_for(days: &[NormalizedPlanDay], now: DateTime<Utc>) -> Vec<Week> {
        build_weeks(days, &[], now, Tz::UTC)
    }

    #[test]
    fn emergency_day_voids_plan() {
        let mut day = plan(19, &[(6.0, 9.0)]);
        day.status = Some(DayStatus::EmergencyShutdowns);
        let now = at(19, 7, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[day], now),
            &status(Tone::Warning, Some(at(19, 6, 0)), now),
            now,
            Tz::UTC,
        );
        assert!(matches!(state, GaugeVisualState::None { .. }));
        assert_eq!(state.captions().top_label, "ГРАФІК НЕ ДІЄ");
    }

    #[test]
    fn scheduled_outage_counts_down_to_plan_end() {
        let now = at(19, 7, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0)])], now),
            &status(Tone::Warning, Some(at(19, 6, 10)), now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::Outage { progress, captions } = state else {
            panic!("variante outage esperada");
        };
        assert_eq!(progress.completed_minutes, 50.0);
        assert_eq!(progress.remaining_minutes, 120.0);
        assert_eq!(progress.total_minutes, 170.0);
        assert!(progress.is_approximate);
        assert_eq!(captions.primary_label, "~2 год");
    }

    #[test]
    fn unscheduled_outage_has_unknown_remaining() {
        let now = at(19, 12, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0)])], now),
            &status(Tone::Warning, Some(at(19, 11, 30)), now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::Outage { progress, captions } = state else {
            panic!("variante outage esperada");
        };
        assert_eq!(progress.remaining_minutes, 0.0);
        assert_eq!(progress.completed_minutes, 30.0);
        assert_eq!(captions.primary_label, "Поки невідомо");
        assert!(!progress.is_approximate);
    }

    #[test]
    fn fresh_plan_window_with_light_is_low_confidence() {
        let now = at(19, 6, 15);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0), (18.0, 20.0)])], now),
            &status(Tone::Ok, None, now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::None { captions } = state else {
            panic!("variante none esperada");
        };
        assert_eq!(captions.primary_label, "невідомо");
        assert_eq!(
            captions.secondary_label.as_deref(),
            Some("Планове вікно 06:00 – 09:00 ще триває.")
        );
    }

    #[test]
    fn late_plan_window_with_light_counts_to_next_window() {
        let now = at(19, 8, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0), (18.0, 20.0)])], now),
            &status(Tone::Ok, None, now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::Uptime { progress, .. } = state else {
            panic!("variante uptime esperada");
        };
        assert_eq!(progress.remaining_minutes, 600.0);
        assert_eq!(progress.total_minutes, 600.0);
        assert_eq!(progress.completed_minutes, 0.0);
    }

    #[test]
    fn light_on_counts_down_to_next_plan() {
        let now = at(19, 12, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0), (18.0, 20.0)])], now),
            &status(Tone::Ok, Some(at(19, 9, 30)), now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::Uptime { progress, captions } = state else {
            panic!("variante uptime esperada");
        };
        assert_eq!(progress.total_minutes, 510.0);
        assert_eq!(progress.remaining_minutes, 360.0);
        assert_eq!(progress.completed_minutes, 150.0);
        assert_eq!(captions.primary_label, "~6 год");
        assert_eq!(captions.secondary_label.as_deref(), Some("Світло є вже 2 год 30 хв"));
    }

    #[test]
    fn previous_plan_end_is_used_without_since() {
        let now = at(19, 12, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0), (18.0, 20.0)])], now),
            &status(Tone::Ok, None, now),
            now,
            Tz::UTC,
        );
        let progress = state.progress().copied().unwrap();
        assert_eq!(progress.total_minutes, 540.0);
        assert_eq!(progress.completed_minutes, 180.0);
    }

    #[test]
    fn no_future_plan_is_unknown() {
        let now = at(19, 12, 0);
        let state = resolve_gauge_state(
            &weeks_for(&[plan(19, &[(6.0, 9.0)])], now),
            &status(Tone::Ok, None, now),
            now,
            Tz::UTC,
        );
        let GaugeVisualState::None { captions } = state else {
            panic!("variante none esperada");
        };
        assert_eq!(
            captions.secondary_label.as_deref(),
            Some("Останній графік завершився 09:00")
        );
        assert_eq!(captions.footnote.as_deref(), Some("Графік на майбутні дні відсутній"));

        let empty = resolve_gauge_state(&weeks_for(&[], now), &status(Tone::Ok, None, now), now, Tz::UTC);
        assert_eq!(empty.captions().secondary_label, None);
    }
}
