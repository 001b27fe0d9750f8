//! # pdf-query
//!
//! Chat with a set of PDF documents through retrieval-augmented generation.
//!
//! Uploaded PDFs are split into overlapping text chunks, embedded with a
//! hosted embedding model and stored in a Pinecone index. Questions are
//! embedded the same way, the three nearest chunks are retrieved and a hosted
//! completion model answers from them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ Extract  │──▶│  Chunk   │──▶│  Embed   │──▶│ Pinecone │
//! │ per page │   │ 1000/100 │   │ + upsert │   │  index   │
//! └──────────┘   └──────────┘   └──────────┘   └────┬─────┘
//!                                                   │ top-3
//!                     ┌──────────┐   ┌──────────┐   │
//!                     │  Answer  │◀──│  Query   │◀──┘
//!                     │ (stuff)  │   │          │
//!                     └──────────┘   └──────────┘
//! ```
//!
//! Both the web UI ([`server`]) and the CLI drive the same two flows in
//! [`pipeline`]. Credentials are supplied per interaction as a
//! [`session::SessionConfig`] and never persisted.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Stage error taxonomy |
//! | [`session`] | Credentials, provider variants, session check |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Text chunking |
//! | [`ingest`] | Extraction + chunking over many documents |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Completion providers |
//! | [`store`] | Vector index abstraction (Pinecone, in-memory) |
//! | [`index`] | Embed and upsert chunks |
//! | [`query`] | Similarity retrieval |
//! | [`answer`] | Prompt building and answer synthesis |
//! | [`pipeline`] | The "process" and "ask" flows |
//! | [`services`] | Service construction per session |
//! | [`ui`] | HTML rendering |
//! | [`server`] | Web server |

pub mod answer;
pub mod chunk;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod server;
pub mod services;
pub mod session;
pub mod store;
pub mod ui;
