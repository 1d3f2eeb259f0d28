//! time.rs — Frações de hora, dias locais e relógio injetável.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

/// Fonte do instante "agora". Permite controlar o tempo nos testes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Relógio parado num instante, avançado manualmente.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Hora do dia como fração: `horas + minutos/60 + segundos/3600`.
pub fn hour_fraction<T: TimeZone>(at: &DateTime<T>) -> f64 {
    at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0
}

/// Fração de hora de um instante no fuso configurado.
pub fn local_hour_fraction(at: DateTime<Utc>, tz: Tz) -> f64 {
    hour_fraction(&at.with_timezone(&tz))
}

/// Restringe a `[0, 24]`; NaN e infinitos viram 0.
pub fn clamp_hour(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 24.0)
}

/// Restringe a `[0, 1]`; NaN e infinitos viram 0.
pub fn clamp_ratio(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Converte um horário de parede local em instante UTC.
/// Em horários ambíguos usa o mais cedo; em lacunas de DST avança uma hora.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => at.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

pub fn local_midnight(day: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(day.and_time(NaiveTime::MIN), tz)
}

/// Instante correspondente à fração de hora `hour` do dia `day` (arredondado ao minuto).
pub fn at_hour(day: NaiveDate, hour: f64, tz: Tz) -> Option<DateTime<Utc>> {
    if !hour.is_finite() {
        return None;
    }
    let minutes = Duration::try_minutes((hour * 60.0).round() as i64)?;
    let naive = day.and_time(NaiveTime::MIN).checked_add_signed(minutes)?;
    Some(resolve_local(naive, tz))
}

/// Segunda-feira da semana que contém `day`.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Minutos (fracionários) de `from` até `to`, nunca negativos.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / 60_000.0).max(0.0)
}
