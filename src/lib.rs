//! 個人用のタスクタイマー兼トラッカー。
//!
//! タスク(kizami)の開始と停止を記録し、ハッシュタグごとの月次集計を行う。

pub mod config;
pub mod console;
pub mod datetime;
pub mod delete_command;
pub mod edit_command;
pub mod editor;
pub mod error;
pub mod list_command;
pub mod logging;
pub mod service;
pub mod sqlite;
pub mod start_command;
pub mod stop_command;
pub mod store;
pub mod summary;
pub mod summary_command;
pub mod tag;
pub mod tags_command;
pub mod time_entry;
