// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON-RPC 2.0 over newline-delimited stdio.
//!
//! Each input line is one request object and each response is written as one
//! line. A [`Session`] tracks the `initialize` handshake and builds the model
//! client the first time a tool is called.
//!
//! ```rust,ignore
//! use gemini_mcp::protocol::Session;
//!
//! let mut session = Session::with_defaults(env_client_factory(config), files);
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! session.serve(stdin, tokio::io::stdout()).await?;
//! ```

mod server;
mod types;

pub use server::Session;
pub use types::{
    decode_line, initialize_result, tool_call_result, tools_list_result, CallToolParams, Decoded,
    Request, Response, PROTOCOL_VERSION, SERVER_NAME, UNKNOWN_ID,
};
