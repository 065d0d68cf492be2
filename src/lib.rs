//! Game Pass news watcher.
//!
//! Polls Xbox news feeds, keeps articles about Game Pass catalogue changes,
//! flags each as an addition and/or removal, drops anything already notified
//! in the last 30 days, and emails a digest of what is left.
//!
//! The library holds all logic; `main.rs` only wires production capabilities
//! ([`feed::FeedFetcher`], [`storage::JsonSeenStore`], [`mail::SmtpMailer`])
//! into a [`runner::Notifier`].

pub mod classify;
pub mod config;
pub mod feed;
pub mod mail;
pub mod pipeline;
pub mod retry;
pub mod runner;
pub mod storage;
pub mod util;
