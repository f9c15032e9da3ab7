pub mod client;
pub mod coin_list;
pub mod error;
pub mod history;
pub mod markets;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod presentation;
pub mod ranking;
pub mod settings;
pub mod snapshot_log;
pub mod storage_utils;
pub mod table_view;
pub mod ttl_cache;
pub mod tui;
