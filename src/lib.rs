//! Agregação de planos de desligamento e faltas reais em visões prontas para consulta:
//! grade semanal, status ao vivo, anel de progresso e timeline horária.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod gauge;
pub mod merge;
pub mod normalize;
pub mod scheduler;
pub mod snake;
pub mod status;
pub mod storage;
pub mod time;
pub mod timeline_codec;
pub mod types;
