//! status.rs — Classificação do estado da energia a partir das faltas reais.

use crate::format;
use crate::types::{ActualOutageRow, PowerStatus, Tone};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// `warning` se alguma falta cobre `now` (a mais recente vence),
/// senão `ok` desde o fim da última falta encerrada.
pub fn resolve_status(rows: &[ActualOutageRow], now: DateTime<Utc>, tz: Tz) -> PowerStatus {
    let now_ts = now.timestamp();

    let active = rows
        .iter()
        .rev()
        .find(|row| row.start_ts <= now_ts && row.end_ts.is_none_or(|end| end > now_ts))
        .and_then(|row| DateTime::from_timestamp(row.start_ts, 0));

    if let Some(started_at) = active {
        let elapsed_label = format::elapsed((now - started_at).num_minutes());
        return PowerStatus {
            tone: Tone::Warning,
            since_iso: Some(started_at),
            current_iso: now,
            title: "Світла немає".to_string(),
            subtitle: format!(
                "Відключення триває {} (з {}).",
                elapsed_label,
                format::status_timestamp(started_at, tz)
            ),
            elapsed_label: Some(elapsed_label),
        };
    }

    let last_ended = rows
        .iter()
        .rev()
        .filter_map(|row| row.end_ts)
        .find(|&end| end <= now_ts)
        .and_then(|end| DateTime::from_timestamp(end, 0));

    let subtitle = match last_ended {
        Some(ended_at) => format!(
            "Останнє відключення завершилось {}.",
            format::status_timestamp(ended_at, tz)
        ),
        None => "Фактичних відключень ще не зафіксовано.".to_string(),
    };

    PowerStatus {
        tone: Tone::Ok,
        since_iso: last_ended,
        current_iso: now,
        title: "Світло є".to_string(),
        subtitle,
        elapsed_label: last_ended.map(|ended_at| format::elapsed((now - ended_at).num_minutes())),
    }
}
