//! # Site Harness
//!
//! Crawl a website breadth-first, index the readable text of each page as an
//! embedding vector, and answer questions from the pages most similar to the
//! question.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌─────────────┐
//! │ Fetcher  │──▶│ Extractor │──▶│ Embedder │──▶│ VectorIndex │
//! │ (reqwest)│   │ (scraper) │   │          │   │  (SQLite)   │
//! └──────────┘   └───────────┘   └──────────┘   └──────┬──────┘
//!       ▲  links via URL filter                         │
//!       └── Crawler (BFS frontier + visited set)        ▼
//!                                                ┌─────────────┐
//!                     CLI (site) / tool server ◀─│ QueryEngine │
//!                                                └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! site init                                   # create database
//! site crawl https://example.com/ --max-pages 50 --exclude /login
//! site ask "what does the homepage say" --top-k 3
//! site serve                                  # start tool server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`urls`] | Link resolution and admission |
//! | [`extract`] | HTML to text, link harvesting |
//! | [`fetch`] | HTTP fetch capability |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector index trait, in-memory index |
//! | [`sqlite_store`] | Durable SQLite vector index |
//! | [`crawl`] | Bounded BFS crawler |
//! | [`query`] | Question answering |
//! | [`app`] | Wiring and host-facing operations |
//! | [`tools`] | Tool trait and built-in tools |
//! | [`server`] | HTTP tool server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod config;
pub mod crawl;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod fetch;
pub mod migrate;
pub mod models;
pub mod query;
pub mod server;
pub mod sqlite_store;
pub mod store;
pub mod tools;
pub mod urls;
