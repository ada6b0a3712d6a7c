//! Telegram ⇄ CRM Transport Bridge
//!
//! Webhook bridge that forwards Telegram bot conversations into a CRM's
//! omnichannel messaging transport and delivers operator replies back.

pub mod api;
pub mod bridge;
pub mod config;
pub mod crm;
pub mod db;
pub mod directory;
pub mod storage;
pub mod telegram;
pub mod transport;
