//! normalize.rs — Converte linhas brutas (plano e faltas reais) em `OutageSegment`.
//!
//! Nada aqui propaga erro: entradas inválidas são descartadas e registradas como
//! `Diagnostic`, o restante da linha continua valendo.

use crate::error::{EntryError, NormalizeError, RowError};
use crate::format;
use crate::time::{clamp_hour, local_date, local_hour_fraction, local_midnight, resolve_local};
use crate::types::{
    ActualOutageRow, DatedSegment, DayStatus, OutageSegment, OutageType, PlanRow, SegmentSource,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Esquema de uma entrada do plano.
#[derive(Debug, Deserialize)]
struct RawPlanEntry {
    start: String,
    end: String,
    #[serde(default, rename = "type")]
    kind: Option<Value>,
}

/// Problema encontrado ao normalizar uma linha (e, opcionalmente, uma entrada dela).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub key: String,
    pub entry: Option<usize>,
    pub error: NormalizeError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(index) => write!(f, "[{} #{}] {}", self.key, index, self.error),
            None => write!(f, "[{}] {}", self.key, self.error),
        }
    }
}

/// Dia do plano já normalizado. Existe mesmo sem segmentos, para carregar o status.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPlanDay {
    pub day: NaiveDate,
    pub status: Option<DayStatus>,
    pub segments: Vec<OutageSegment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanParse {
    pub days: Vec<NormalizedPlanDay>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Aceita RFC 3339 e, sem offset, horário local do fuso configurado.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(raw, pattern).ok())
        .map(|naive| resolve_local(naive, tz))
}

/// Monta o segmento de `[start, end)` em frações de hora.
/// `end_hour <= start_hour` (fim na meia-noite ou depois dela) vira 24.
fn build_segment(
    id: String,
    source: SegmentSource,
    kind: OutageType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: Tz,
) -> Result<OutageSegment, EntryError> {
    let duration_hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
    if end <= start || duration_hours <= 0.0 {
        return Err(EntryError::NonPositiveDuration {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }

    let start_hour = clamp_hour(local_hour_fraction(start, tz));
    let mut end_hour = clamp_hour(local_hour_fraction(end, tz));
    if end_hour <= start_hour {
        end_hour = 24.0;
    }

    let range = format::time_range(start, end, tz);
    let label = match source {
        SegmentSource::Plan => format!(
            "{} ({}, {})",
            range,
            kind.as_str(),
            format::hours(duration_hours)
        ),
        SegmentSource::Actual => format!("Факт: {} ({})", range, format::hours(duration_hours)),
    };

    Ok(OutageSegment {
        id,
        source,
        start_hour,
        end_hour,
        kind,
        label,
        duration_hours,
    })
}

/// Normaliza uma entrada `{start, end, type?}` do plano do dia `day`.
pub fn normalize_plan_entry(
    day: NaiveDate,
    raw: &Value,
    index: usize,
    tz: Tz,
) -> Result<OutageSegment, EntryError> {
    let entry = RawPlanEntry::deserialize(raw)
        .map_err(|e| EntryError::InvalidShape(e.to_string()))?;

    let start = parse_timestamp(&entry.start, tz).ok_or_else(|| EntryError::InvalidTimestamp {
        field: "start",
        value: entry.start.clone(),
    })?;
    let end = parse_timestamp(&entry.end, tz).ok_or_else(|| EntryError::InvalidTimestamp {
        field: "end",
        value: entry.end.clone(),
    })?;
    let kind = OutageType::from_raw(entry.kind.as_ref().and_then(Value::as_str));

    build_segment(
        format!("{day}-{index}-plan"),
        SegmentSource::Plan,
        kind,
        start,
        end,
        tz,
    )
}

/// Normaliza uma linha do plano. Linhas com data inválida são descartadas por inteiro;
/// JSON inválido mantém o dia (com status) e zero segmentos.
pub fn normalize_plan_row(
    row: &PlanRow,
    tz: Tz,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<NormalizedPlanDay> {
    let key = row.schedule_date.trim();
    let Ok(day) = NaiveDate::parse_from_str(key, "%Y-%m-%d") else {
        warn!("Linha do plano com data inválida: {:?}", row.schedule_date);
        diagnostics.push(Diagnostic {
            key: row.schedule_date.clone(),
            entry: None,
            error: RowError::InvalidDate(row.schedule_date.clone()).into(),
        });
        return None;
    };

    let status = row
        .status
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| DayStatus::from(raw.to_string()));

    let mut day_entry = NormalizedPlanDay {
        day,
        status,
        segments: Vec::new(),
    };

    let Some(payload) = row.outages_json.as_deref().filter(|raw| !raw.trim().is_empty()) else {
        return Some(day_entry);
    };

    let row_error = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => {
            for (index, raw) in entries.iter().enumerate() {
                match normalize_plan_entry(day, raw, index, tz) {
                    Ok(segment) => day_entry.segments.push(segment),
                    Err(error) => {
                        warn!("[{}] Entrada #{} do plano descartada: {}", day, index, error);
                        diagnostics.push(Diagnostic {
                            key: day.to_string(),
                            entry: Some(index),
                            error: error.into(),
                        });
                    }
                }
            }
            None
        }
        Ok(_) => Some(RowError::NotAnArray),
        Err(e) => Some(RowError::InvalidJson(e.to_string())),
    };

    if let Some(error) = row_error {
        warn!("[{}] Não foi possível ler outages_json: {}", day, error);
        diagnostics.push(Diagnostic {
            key: day.to_string(),
            entry: None,
            error: error.into(),
        });
    }

    Some(day_entry)
}

pub fn normalize_plan_rows(rows: &[PlanRow], tz: Tz) -> PlanParse {
    let mut diagnostics = Vec::new();
    let days = rows
        .iter()
        .filter_map(|row| normalize_plan_row(row, tz, &mut diagnostics))
        .collect();
    PlanParse { days, diagnostics }
}

/// Converte as faltas reais em segmentos, um por dia de calendário tocado.
/// Faltas em curso (`end_ts` ausente) vão até `now`.
pub fn normalize_actual_rows(
    rows: &[ActualOutageRow],
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<DatedSegment> {
    let mut segments = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let Some(start) = DateTime::from_timestamp(row.start_ts, 0) else {
            warn!("Falta #{} com start_ts inválido: {}", row_index, row.start_ts);
            continue;
        };
        let end = match row.end_ts {
            Some(ts) => match DateTime::from_timestamp(ts, 0) {
                Some(end) => end,
                None => {
                    warn!("Falta #{} com end_ts inválido: {}", row_index, ts);
                    continue;
                }
            },
            None => now,
        };
        if end <= start {
            debug!("Falta #{} ignorada: fim {} <= início {}", row_index, end, start);
            continue;
        }

        let mut cursor = start;
        let mut segment_index = 0;
        while cursor < end {
            let day = local_date(cursor, tz);
            let Some(next_midnight) = day.succ_opt().map(|next| local_midnight(next, tz)) else {
                break;
            };
            if next_midnight <= cursor {
                break;
            }
            let segment_end = end.min(next_midnight);

            match build_segment(
                format!("{day}-actual-{row_index}-{segment_index}"),
                SegmentSource::Actual,
                OutageType::Actual,
                cursor,
                segment_end,
                tz,
            ) {
                Ok(segment) => segments.push(DatedSegment { day, segment }),
                Err(error) => debug!("Falta #{} parte {} descartada: {}", row_index, segment_index, error),
            }

            cursor = segment_end;
            segment_index += 1;
        }
    }

    segments
}
