//! timeline_codec.rs — Forma compacta (base64 de JSON) da timeline para renderização estática.
//!
//! A decodificação nunca falha por campo: números são restringidos às faixas válidas e
//! campos ausentes recebem padrão. Só payloads ilegíveis viram `TimelineDecodeError`.

use crate::error::TimelineDecodeError;
use crate::format;
use crate::snake::TOTAL_SLOTS;
use crate::time::{clamp_hour, clamp_ratio, local_date, local_hour_fraction};
use crate::types::{SnakeTimelineData, SnakeTimelineSlot, SnakeTimelineSummary};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

const DEFAULT_CONTEXT_LABEL: &str = "Сьогодні";

/// Padrões dependentes do instante da decodificação.
struct Defaults {
    now_hour: f64,
    day_label: String,
    date_label: String,
    current_time_label: String,
}

impl Defaults {
    fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            now_hour: local_hour_fraction(now, tz),
            day_label: DEFAULT_CONTEXT_LABEL.to_string(),
            date_label: format::calendar_date(local_date(now, tz)),
            current_time_label: format::clock_time(now, tz),
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn clamp_index(value: f64) -> usize {
    if !value.is_finite() || value < 0.0 {
        return 0;
    }
    (value.floor() as usize).min(TOTAL_SLOTS - 1)
}

/// Slot normalizado; `raw_*` já tem os ausentes/NaN trocados pelo padrão do índice.
fn clamp_slot(raw_index: f64, raw_start: f64, raw_end: Option<f64>, fill: f64, fill_start: f64) -> SnakeTimelineSlot {
    let start_hour = clamp_hour(raw_start);
    let default_end = (start_hour + 1.0).min(24.0);
    let mut end_hour = clamp_hour(raw_end.unwrap_or(default_end));
    if end_hour <= start_hour {
        end_hour = default_end;
    }
    SnakeTimelineSlot {
        index: clamp_index(raw_index),
        start_hour,
        end_hour,
        fill_ratio: clamp_ratio(fill),
        fill_start_ratio: clamp_ratio(fill_start),
    }
}

/// Resumo normalizado a partir de valores crus (NaN = ausente).
fn clamp_summary(
    planned: f64,
    actual: f64,
    outage: f64,
    light: f64,
    diff: f64,
    has_actual_data: Option<bool>,
) -> SnakeTimelineSummary {
    let planned_hours = clamp_hour(finite_or(planned, 0.0));
    let actual_hours = clamp_hour(finite_or(actual, 0.0));
    let outage_hours = clamp_hour(finite_or(outage, actual_hours));
    let light_hours = clamp_hour(finite_or(light, 24.0 - outage_hours));
    SnakeTimelineSummary {
        planned_hours,
        actual_hours,
        outage_hours,
        light_hours,
        diff_hours: finite_or(diff, planned_hours - actual_hours),
        has_actual_data: has_actual_data.unwrap_or(outage_hours > 0.0),
    }
}

/// Completa até 24 slots vazios; lista vazia vira 24 slots vazios.
fn pad_slots(mut slots: Vec<SnakeTimelineSlot>) -> Vec<SnakeTimelineSlot> {
    slots.truncate(TOTAL_SLOTS);
    while slots.len() < TOTAL_SLOTS {
        slots.push(SnakeTimelineSlot::empty(slots.len()));
    }
    slots
}

pub fn empty_slots() -> Vec<SnakeTimelineSlot> {
    (0..TOTAL_SLOTS).map(SnakeTimelineSlot::empty).collect()
}

impl SnakeTimelineData {
    /// Forma normalizada: a decodificação de `encode_timeline(x)` é igual a `x.clamped(..)`.
    pub fn clamped(self, now: DateTime<Utc>, tz: Tz) -> Self {
        let defaults = Defaults::at(now, tz);
        let slots = pad_slots(
            self.slots
                .iter()
                .take(TOTAL_SLOTS)
                .enumerate()
                .map(|(position, slot)| {
                    let fallback = position as f64;
                    clamp_slot(
                        slot.index as f64,
                        finite_or(slot.start_hour, fallback),
                        slot.end_hour.is_finite().then_some(slot.end_hour),
                        finite_or(slot.fill_ratio, 0.0),
                        finite_or(slot.fill_start_ratio, 0.0),
                    )
                })
                .collect(),
        );
        let summary = clamp_summary(
            self.summary.planned_hours,
            self.summary.actual_hours,
            self.summary.outage_hours,
            self.summary.light_hours,
            self.summary.diff_hours,
            Some(self.summary.has_actual_data),
        );

        Self {
            slots,
            day_label: non_empty_or(&self.day_label, &defaults.day_label),
            date_label: non_empty_or(&self.date_label, &defaults.date_label),
            now_hour: clamp_hour(finite_or(self.now_hour, defaults.now_hour)),
            status: self.status,
            has_plan_segments: self.has_plan_segments,
            is_placeholder: self.is_placeholder,
            current_time_label: non_empty_or(&self.current_time_label, &defaults.current_time_label),
            summary,
            context_label: non_empty_or(&self.context_label, DEFAULT_CONTEXT_LABEL),
            show_current_time_indicator: self.show_current_time_indicator,
            is_future_day: self.is_future_day,
        }
    }
}

/// Timeline vazia usada quando não há dados ou o payload não pôde ser lido.
pub fn placeholder_timeline(now: DateTime<Utc>, tz: Tz) -> SnakeTimelineData {
    let today = local_date(now, tz);
    SnakeTimelineData {
        slots: empty_slots(),
        day_label: format::readable_day_label(today),
        date_label: format::calendar_date(today),
        now_hour: clamp_hour(local_hour_fraction(now, tz)),
        status: None,
        has_plan_segments: false,
        is_placeholder: true,
        current_time_label: format::clock_time(now, tz),
        summary: SnakeTimelineSummary {
            planned_hours: 0.0,
            actual_hours: 0.0,
            outage_hours: 0.0,
            light_hours: 24.0,
            diff_hours: 0.0,
            has_actual_data: false,
        },
        context_label: DEFAULT_CONTEXT_LABEL.to_string(),
        show_current_time_indicator: true,
        is_future_day: false,
    }
}

/// Base64 URL-safe, sem padding, do JSON da timeline.
pub fn encode_timeline(data: &SnakeTimelineData) -> serde_json::Result<String> {
    let json = serde_json::to_vec(data)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_base64(raw: &str) -> Result<Vec<u8>, TimelineDecodeError> {
    let sanitized: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .trim_end_matches('=')
        .to_string();
    if sanitized.is_empty() {
        return Err(TimelineDecodeError::Empty);
    }
    URL_SAFE_NO_PAD
        .decode(&sanitized)
        .or_else(|_| STANDARD_NO_PAD.decode(&sanitized))
        .map_err(|e| TimelineDecodeError::InvalidBase64(e.to_string()))
}

fn number(source: &Map<String, Value>, key: &str) -> Option<f64> {
    source.get(key).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn boolean(source: &Map<String, Value>, key: &str) -> Option<bool> {
    source.get(key).and_then(Value::as_bool)
}

fn string<'a>(source: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    source.get(key).and_then(Value::as_str)
}

fn slots_from_value(value: Option<&Value>) -> Vec<SnakeTimelineSlot> {
    let Some(Value::Array(items)) = value else {
        return empty_slots();
    };
    pad_slots(
        items
            .iter()
            .take(TOTAL_SLOTS)
            .enumerate()
            .map(|(position, item)| {
                let Value::Object(slot) = item else {
                    return SnakeTimelineSlot::empty(position);
                };
                let fallback = position as f64;
                clamp_slot(
                    number(slot, "index").unwrap_or(fallback),
                    number(slot, "startHour").unwrap_or(fallback),
                    number(slot, "endHour"),
                    number(slot, "fillRatio").unwrap_or(0.0),
                    number(slot, "fillStartRatio").unwrap_or(0.0),
                )
            })
            .collect(),
    )
}

fn summary_from_value(value: Option<&Value>) -> SnakeTimelineSummary {
    let empty = Map::new();
    let source = match value {
        Some(Value::Object(summary)) => summary,
        _ => &empty,
    };
    clamp_summary(
        number(source, "plannedHours").unwrap_or(f64::NAN),
        number(source, "actualHours").unwrap_or(f64::NAN),
        number(source, "outageHours").unwrap_or(f64::NAN),
        number(source, "lightHours").unwrap_or(f64::NAN),
        number(source, "diffHours").unwrap_or(f64::NAN),
        boolean(source, "hasActualData"),
    )
}

fn timeline_from_value(value: Value, now: DateTime<Utc>, tz: Tz) -> Result<SnakeTimelineData, TimelineDecodeError> {
    let Value::Object(source) = value else {
        return Err(TimelineDecodeError::InvalidShape);
    };
    let defaults = Defaults::at(now, tz);

    let slots = slots_from_value(source.get("slots"));
    let has_plan_segments = boolean(&source, "hasPlanSegments")
        .unwrap_or_else(|| slots.iter().any(|slot| slot.fill_ratio > 0.0));

    Ok(SnakeTimelineData {
        day_label: non_empty_or(string(&source, "dayLabel").unwrap_or_default(), &defaults.day_label),
        date_label: non_empty_or(string(&source, "dateLabel").unwrap_or_default(), &defaults.date_label),
        now_hour: clamp_hour(number(&source, "nowHour").unwrap_or(defaults.now_hour)),
        status: string(&source, "status").map(str::to_string),
        is_placeholder: boolean(&source, "isPlaceholder").unwrap_or(!has_plan_segments),
        has_plan_segments,
        current_time_label: non_empty_or(
            string(&source, "currentTimeLabel").unwrap_or_default(),
            &defaults.current_time_label,
        ),
        summary: summary_from_value(source.get("summary")),
        context_label: non_empty_or(
            string(&source, "contextLabel").unwrap_or_default(),
            DEFAULT_CONTEXT_LABEL,
        ),
        show_current_time_indicator: boolean(&source, "showCurrentTimeIndicator").unwrap_or(true),
        is_future_day: boolean(&source, "isFutureDay").unwrap_or(false),
        slots,
    })
}

/// Decodifica o parâmetro `data`: JSON cru (começa com `{` ou `[`) ou base64 (padrão ou URL-safe).
pub fn decode_timeline(
    raw: Option<&str>,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<SnakeTimelineData, TimelineDecodeError> {
    let raw = raw.ok_or(TimelineDecodeError::Missing)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimelineDecodeError::Empty);
    }

    let payload = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        String::from_utf8(decode_base64(trimmed)?).map_err(|_| TimelineDecodeError::InvalidUtf8)?
    };

    let value: Value = serde_json::from_str(&payload)
        .map_err(|e| TimelineDecodeError::InvalidJson(e.to_string()))?;
    timeline_from_value(value, now, tz)
}
