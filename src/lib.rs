#![forbid(unsafe_code)]

//! Core of the FEMCARE wellness companion.
//!
//! - Period tracking: marked dates, cycle length, next-period prediction
//! - Companion chat with crisis detection and guardian alerts
//! - PCOD symptom screening
//! - Encrypted local persistence

pub mod chat;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod distress;
pub mod logging;
pub mod models;
pub mod notify;
pub mod prediction;
pub mod responses;
pub mod screening;
pub mod storage;
pub mod tracker;

pub use chat::{AlertOutcome, ChatReply, ChatSession};
pub use config::Config;
pub use distress::{Classification, DistressClassifier};
pub use models::{CycleRecord, CycleStatus, DistressEvent};
pub use notify::{GuardianAlert, HttpNotifier, NotificationPolicy, Notifier};
pub use storage::{FileStore, MemoryStore, RecordStore};
pub use tracker::CycleTracker;
