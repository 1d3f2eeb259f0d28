//! dashboard.rs — Junta o pipeline inteiro num snapshot serializável.

use crate::aggregate::build_weeks;
use crate::gauge::resolve_gauge_state;
use crate::merge::resolve_plan_summary;
use crate::normalize::{normalize_actual_rows, normalize_plan_rows};
use crate::snake::{TimelineScope, resolve_snake_timeline};
use crate::status::resolve_status;
use crate::timeline_codec::encode_timeline;
use crate::types::{GaugeVisualState, PlanSummary, PowerStatus, RawRows, SnakeTimelineData, Week};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub weeks: Vec<Week>,
    pub status: PowerStatus,
    pub gauge: GaugeVisualState,
    pub plan_summary: Option<PlanSummary>,
    pub timeline_today: SnakeTimelineData,
    pub timeline_tomorrow: SnakeTimelineData,
    /// `None` se a serialização falhar; o resto do snapshot continua válido.
    pub timeline_today_encoded: Option<String>,
    /// Linhas e entradas descartadas na normalização, já formatadas.
    pub diagnostics: Vec<String>,
}

/// Calcula tudo a partir de um snapshot das linhas. Função pura de `(rows, now, tz)`.
pub fn build_dashboard(rows: &RawRows, now: DateTime<Utc>, tz: Tz) -> DashboardSnapshot {
    let plan = normalize_plan_rows(&rows.plans, tz);
    let actual = normalize_actual_rows(&rows.actuals, now, tz);

    let weeks = build_weeks(&plan.days, &actual, now, tz);
    let status = resolve_status(&rows.actuals, now, tz);
    let gauge = resolve_gauge_state(&weeks, &status, now, tz);
    let plan_summary = resolve_plan_summary(&weeks, now, tz);
    let timeline_today = resolve_snake_timeline(&weeks, now, tz, TimelineScope::Today);
    let timeline_tomorrow = resolve_snake_timeline(&weeks, now, tz, TimelineScope::Tomorrow);

    let timeline_today_encoded = match encode_timeline(&timeline_today) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!("Falha ao codificar a timeline de hoje: {:?}", e);
            None
        }
    };

    debug!(
        "Snapshot: {} dia(s) de plano, {} descarte(s), {} segmento(s) reais, status {:?}",
        plan.days.len(),
        plan.diagnostics.len(),
        actual.len(),
        status.tone
    );

    DashboardSnapshot {
        generated_at: now,
        weeks,
        status,
        gauge,
        plan_summary,
        timeline_today,
        timeline_tomorrow,
        timeline_today_encoded,
        diagnostics: plan.diagnostics.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline_codec::decode_timeline;
    use crate::types::{ActualOutageRow, PlanRow, Tone};
    use chrono::TimeZone;

    fn rows() -> RawRows {
        RawRows {
            plans: vec![
                PlanRow {
                    schedule_date: "2026-10-19".to_string(),
                    status: Some("ScheduleApplies".to_string()),
                    outages_json: Some(
                        r#"[{"start": "2026-10-19T06:00:00+03:00", "end": "2026-10-19T09:00:00+03:00", "type": "Definite"},
                            {"start": "2026-10-19T18:00:00+03:00", "end": "2026-10-19T21:00:00+03:00", "type": "Definite"},
                            {"start": "oops", "end": "2026-10-19T21:00:00+03:00"}]"#
                            .to_string(),
                    ),
                },
                PlanRow {
                    schedule_date: "not-a-date".to_string(),
                    status: None,
                    outages_json: None,
                },
            ],
            actuals: vec![ActualOutageRow {
                start_ts: Utc.with_ymd_and_hms(2026, 10, 19, 3, 10, 0).unwrap().timestamp(),
                end_ts: Some(Utc.with_ymd_and_hms(2026, 10, 19, 5, 40, 0).unwrap().timestamp()),
            }],
        }
    }

    #[test]
    fn snapshot_combines_every_stage() {
        let tz: Tz = "Europe/Kyiv".parse().unwrap();
        // 12:00 em Kyiv
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let snapshot = build_dashboard(&rows(), now, tz);

        assert_eq!(snapshot.generated_at, now);
        assert_eq!(snapshot.weeks.len(), 1);
        assert_eq!(snapshot.status.tone, Tone::Ok);
        assert_eq!(snapshot.diagnostics.len(), 2);

        let Some(PlanSummary::Normal { segments, current, next }) = &snapshot.plan_summary else {
            panic!("resumo normal esperado");
        };
        assert_eq!(segments.len(), 2);
        assert!(current.is_none());
        assert_eq!(next.map(|n| n.start), Some(Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()));

        assert!(matches!(snapshot.gauge, GaugeVisualState::Uptime { .. }));
        assert!(snapshot.timeline_today.has_plan_segments);
        assert_eq!(snapshot.timeline_today.slots[6].fill_ratio, 1.0);
        assert!(snapshot.timeline_tomorrow.is_placeholder);

        let encoded = snapshot.timeline_today_encoded.as_deref();
        let decoded = decode_timeline(encoded, now, tz).unwrap();
        assert_eq!(decoded, snapshot.timeline_today);
    }

    #[test]
    fn snapshot_serializes_in_camel_case() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let json = serde_json::to_value(build_dashboard(&RawRows::default(), now, Tz::UTC)).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("timelineToday").is_some());
        assert_eq!(json["status"]["tone"], "ok");
        assert!(json["planSummary"].is_null());
        assert_eq!(json["weeks"][0]["days"].as_array().map(Vec::len), Some(7));
    }
}
