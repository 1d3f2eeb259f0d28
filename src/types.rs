use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// Linha bruta do plano diário (tabela `schedules`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub schedule_date: String,
    pub status: Option<String>,
    /// Lista de entradas `{start, end, type?}` ainda como JSON cru.
    pub outages_json: Option<String>,
}

impl TryFrom<Row> for PlanRow {
    type Error = tokio_postgres::Error;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Self {
            schedule_date: row.try_get("schedule_date")?,
            status: row.try_get("status")?,
            outages_json: row.try_get("outages_json")?,
        })
    }
}

/// Intervalo de falta observado (tabela `outages`), em segundos unix.
/// `end_ts` ausente significa que a falta ainda está em curso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActualOutageRow {
    pub start_ts: i64,
    pub end_ts: Option<i64>,
}

impl TryFrom<Row> for ActualOutageRow {
    type Error = tokio_postgres::Error;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(Self {
            start_ts: row.try_get("start_ts")?,
            end_ts: row.try_get("end_ts")?,
        })
    }
}

/// Snapshot imutável das duas fontes de linhas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    pub plans: Vec<PlanRow>,
    pub actuals: Vec<ActualOutageRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Plan,
    Actual,
}

/// Tipo do segmento. Strings desconhecidas viram `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutageType {
    Definite,
    Possible,
    Maintenance,
    Actual,
    Unknown,
}

impl OutageType {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("Definite") => Self::Definite,
            Some("Possible") => Self::Possible,
            Some("Maintenance") => Self::Maintenance,
            Some("Actual") => Self::Actual,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definite => "Definite",
            Self::Possible => "Possible",
            Self::Maintenance => "Maintenance",
            Self::Actual => "Actual",
            Self::Unknown => "Unknown",
        }
    }
}

/// Status publicado para o dia. Valores fora da lista são preservados em `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DayStatus {
    ScheduleApplies,
    WaitingForSchedule,
    EmergencyShutdowns,
    Other(String),
}

impl DayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ScheduleApplies => "ScheduleApplies",
            Self::WaitingForSchedule => "WaitingForSchedule",
            Self::EmergencyShutdowns => "EmergencyShutdowns",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for DayStatus {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "ScheduleApplies" => Self::ScheduleApplies,
            "WaitingForSchedule" => Self::WaitingForSchedule,
            "EmergencyShutdowns" => Self::EmergencyShutdowns,
            _ => Self::Other(raw),
        }
    }
}

impl From<DayStatus> for String {
    fn from(status: DayStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Segmento de falta em frações de hora do dia.
/// Invariante: `0 <= start_hour < end_hour <= 24`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutageSegment {
    pub id: String,
    pub source: SegmentSource,
    pub start_hour: f64,
    pub end_hour: f64,
    #[serde(rename = "type")]
    pub kind: OutageType,
    pub label: String,
    pub duration_hours: f64,
}

/// Segmento normalizado já associado ao dia do calendário.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedSegment {
    pub day: NaiveDate,
    pub segment: OutageSegment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub key: NaiveDate,
    pub title: String,
    #[serde(rename = "dateISO")]
    pub date_iso: DateTime<Utc>,
    pub status: Option<DayStatus>,
    pub planned_hours: f64,
    pub actual_hours: f64,
    /// Ordenados por `start_hour`.
    pub segments: Vec<OutageSegment>,
    /// Presente apenas no dia corrente.
    pub now_hour: Option<f64>,
    pub is_placeholder: bool,
}

impl DaySchedule {
    pub fn plan_segments(&self) -> impl Iterator<Item = &OutageSegment> {
        self.segments
            .iter()
            .filter(|segment| segment.source == SegmentSource::Plan)
    }

    pub fn has_actual_data(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| segment.source == SegmentSource::Actual)
    }

    pub fn is_emergency(&self) -> bool {
        self.status == Some(DayStatus::EmergencyShutdowns)
    }
}

/// Sete dias consecutivos, começando na segunda-feira.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: NaiveDate,
    #[serde(rename = "startISO")]
    pub start_iso: DateTime<Utc>,
    #[serde(rename = "endISO")]
    pub end_iso: DateTime<Utc>,
    pub range_label: String,
    pub days: Vec<DaySchedule>,
}

/// Intervalo de plano em instantes absolutos (pode atravessar a meia-noite).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedPlanInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl MergedPlanInterval {
    /// Duração arredondada ao minuto, nunca menor que 1.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let minutes = ((end - start).num_seconds() as f64 / 60.0).round() as i64;
        Self {
            start,
            end,
            duration_minutes: minutes.max(1),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Resumo do plano para hoje (mais a madrugada de amanhã).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanSummary {
    Emergency,
    Normal {
        segments: Vec<MergedPlanInterval>,
        current: Option<MergedPlanInterval>,
        next: Option<MergedPlanInterval>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Ok,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerStatus {
    pub tone: Tone,
    #[serde(rename = "sinceISO")]
    pub since_iso: Option<DateTime<Utc>>,
    #[serde(rename = "currentISO")]
    pub current_iso: DateTime<Utc>,
    pub title: String,
    pub subtitle: String,
    pub elapsed_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeCaptions {
    pub top_label: String,
    pub primary_label: String,
    pub secondary_label: Option<String>,
    pub footnote: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeProgress {
    pub completed_minutes: f64,
    pub remaining_minutes: f64,
    /// Nunca menor que 1 (usado como divisor no anel).
    pub total_minutes: f64,
    pub is_approximate: bool,
}

impl GaugeProgress {
    pub fn new(completed: f64, remaining: f64, total: f64, is_approximate: bool) -> Self {
        Self {
            completed_minutes: completed.max(0.0),
            remaining_minutes: remaining.max(0.0),
            total_minutes: total.max(1.0),
            is_approximate,
        }
    }

    pub fn fill_ratio(&self) -> f64 {
        (self.completed_minutes / self.total_minutes).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum GaugeVisualState {
    Outage {
        #[serde(flatten)]
        progress: GaugeProgress,
        #[serde(flatten)]
        captions: GaugeCaptions,
    },
    Uptime {
        #[serde(flatten)]
        progress: GaugeProgress,
        #[serde(flatten)]
        captions: GaugeCaptions,
    },
    None {
        #[serde(flatten)]
        captions: GaugeCaptions,
    },
}

impl GaugeVisualState {
    pub fn captions(&self) -> &GaugeCaptions {
        match self {
            Self::Outage { captions, .. } | Self::Uptime { captions, .. } | Self::None { captions } => {
                captions
            }
        }
    }

    pub fn progress(&self) -> Option<&GaugeProgress> {
        match self {
            Self::Outage { progress, .. } | Self::Uptime { progress, .. } => Some(progress),
            Self::None { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeTimelineSlot {
    pub index: usize,
    pub start_hour: f64,
    pub end_hour: f64,
    pub fill_ratio: f64,
    pub fill_start_ratio: f64,
}

impl SnakeTimelineSlot {
    pub fn empty(index: usize) -> Self {
        let start_hour = index as f64;
        Self {
            index,
            start_hour,
            end_hour: (start_hour + 1.0).min(24.0),
            fill_ratio: 0.0,
            fill_start_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeTimelineSummary {
    pub planned_hours: f64,
    pub actual_hours: f64,
    pub outage_hours: f64,
    pub light_hours: f64,
    pub diff_hours: f64,
    pub has_actual_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnakeTimelineData {
    pub slots: Vec<SnakeTimelineSlot>,
    pub day_label: String,
    pub date_label: String,
    pub now_hour: f64,
    pub status: Option<String>,
    pub has_plan_segments: bool,
    pub is_placeholder: bool,
    pub current_time_label: String,
    pub summary: SnakeTimelineSummary,
    pub context_label: String,
    pub show_current_time_indicator: bool,
    pub is_future_day: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_outage_types_fall_back() {
        assert_eq!(OutageType::from_raw(Some("Definite")), OutageType::Definite);
        assert_eq!(OutageType::from_raw(Some(" Possible ")), OutageType::Possible);
        assert_eq!(OutageType::from_raw(Some("Blackout")), OutageType::Unknown);
        assert_eq!(OutageType::from_raw(None), OutageType::Unknown);
    }

    #[test]
    fn day_status_keeps_unknown_strings() {
        assert_eq!(
            DayStatus::from("EmergencyShutdowns".to_string()),
            DayStatus::EmergencyShutdowns
        );
        let other = DayStatus::from("Holiday".to_string());
        assert_eq!(other, DayStatus::Other("Holiday".to_string()));
        assert_eq!(String::from(other), "Holiday");
    }

    #[test]
    fn merged_interval_duration_is_at_least_one_minute() {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap();
        let interval = MergedPlanInterval::new(start, start + chrono::Duration::seconds(10));
        assert_eq!(interval.duration_minutes, 1);
        let interval = MergedPlanInterval::new(start, start + chrono::Duration::hours(3));
        assert_eq!(interval.duration_minutes, 180);
        assert!(interval.contains(start));
        assert!(!interval.contains(interval.end));
    }

    #[test]
    fn gauge_serializes_with_variant_tag() {
        let state = GaugeVisualState::Uptime {
            progress: GaugeProgress::new(30.0, 90.0, 120.0, true),
            captions: GaugeCaptions {
                top_label: "До відключення".to_string(),
                primary_label: "~1 год 30 хв".to_string(),
                secondary_label: None,
                footnote: None,
            },
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["variant"], "uptime");
        assert_eq!(json["totalMinutes"], 120.0);
        assert_eq!(json["topLabel"], "До відключення");
        assert!((state.progress().unwrap().fill_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn gauge_progress_floors_values() {
        let progress = GaugeProgress::new(-5.0, -1.0, 0.0, false);
        assert_eq!(progress.completed_minutes, 0.0);
        assert_eq!(progress.remaining_minutes, 0.0);
        assert_eq!(progress.total_minutes, 1.0);
    }
}
