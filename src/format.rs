//! format.rs — Rótulos em ucraniano exibidos pela interface.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;

const WEEKDAYS_SHORT: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Нд"];
const WEEKDAYS_LONG: [&str; 7] = [
    "Понеділок",
    "Вівторок",
    "Середа",
    "Четвер",
    "П'ятниця",
    "Субота",
    "Неділя",
];

/// `20.10`
pub fn day_month(day: NaiveDate) -> String {
    day.format("%d.%m").to_string()
}

/// `20.10.2026`
pub fn calendar_date(day: NaiveDate) -> String {
    day.format("%d.%m.%Y").to_string()
}

/// Título curto do dia: `Пн (20.10)`.
pub fn day_title(day: NaiveDate) -> String {
    let weekday = WEEKDAYS_SHORT[day.weekday().num_days_from_monday() as usize];
    format!("{} ({})", weekday, day_month(day))
}

/// Título longo do dia: `Понеділок (20.10)`.
pub fn readable_day_label(day: NaiveDate) -> String {
    let weekday = WEEKDAYS_LONG[day.weekday().num_days_from_monday() as usize];
    format!("{} ({})", weekday, day_month(day))
}

pub fn week_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} – {}", day_month(start), day_month(end))
}

/// `06:00` no fuso configurado.
pub fn clock_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M").to_string()
}

pub fn time_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> String {
    format!("{} – {}", clock_time(start, tz), clock_time(end, tz))
}

/// `20.10 06:00`
pub fn status_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m %H:%M").to_string()
}

/// Só a hora quando cai no mesmo dia de `reference`, senão `20.10 о 06:00`.
pub fn short_date_time(target: DateTime<Utc>, reference: DateTime<Utc>, tz: Tz) -> String {
    let local_target = target.with_timezone(&tz);
    if local_target.date_naive() == reference.with_timezone(&tz).date_naive() {
        return clock_time(target, tz);
    }
    format!(
        "{} о {}",
        day_month(local_target.date_naive()),
        clock_time(target, tz)
    )
}

/// Duração arredondada: `2 год 30 хв`, ou `менше 1 хв`.
pub fn duration(total_minutes: f64) -> String {
    let rounded = if total_minutes.is_finite() {
        total_minutes.round().max(0.0) as i64
    } else {
        0
    };
    let hours = rounded / 60;
    let minutes = rounded % 60;
    let mut parts = Vec::with_capacity(2);
    if hours > 0 {
        parts.push(format!("{hours} год"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} хв"));
    }
    if parts.is_empty() {
        return "менше 1 хв".to_string();
    }
    parts.join(" ")
}

/// Tempo decorrido com no máximo duas unidades: `1 д 3 год`, `0 хв`.
pub fn elapsed(total_minutes: i64) -> String {
    let total_minutes = total_minutes.max(0);
    let days = total_minutes / (60 * 24);
    let hours = (total_minutes - days * 60 * 24) / 60;
    let minutes = total_minutes - days * 60 * 24 - hours * 60;
    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days} д"));
    }
    if hours > 0 {
        parts.push(format!("{hours} год"));
    }
    if minutes > 0 || parts.is_empty() {
        parts.push(format!("{minutes} хв"));
    }
    parts.truncate(2);
    parts.join(" ")
}

pub fn hours(value: f64) -> String {
    format!("{value:.2} год")
}
