use thiserror::Error;

/// Falha de uma entrada individual do plano. A entrada é descartada, o resto da linha segue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("entrada fora do esquema {{start, end, type?}}: {0}")]
    InvalidShape(String),
    #[error("timestamp inválido em `{field}`: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("duração não positiva ({start} -> {end})")]
    NonPositiveDuration { start: String, end: String },
}

/// Falha de uma linha inteira do plano.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("data do plano inválida: {0:?}")]
    InvalidDate(String),
    #[error("outages_json não é JSON válido: {0}")]
    InvalidJson(String),
    #[error("outages_json não é uma lista")]
    NotAnArray,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Row(#[from] RowError),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// Resultado "parse failed" da decodificação de uma timeline externa.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineDecodeError {
    #[error("parâmetro `data` não informado")]
    Missing,
    #[error("parâmetro `data` vazio")]
    Empty,
    #[error("base64 inválido: {0}")]
    InvalidBase64(String),
    #[error("payload não é UTF-8")]
    InvalidUtf8,
    #[error("JSON inválido: {0}")]
    InvalidJson(String),
    #[error("JSON não corresponde à estrutura da timeline")]
    InvalidShape,
}
