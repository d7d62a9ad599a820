//! The two store operations a load pass is built from.
//!
//! Each issues exactly one command in its own batch and interprets the
//! single reply. Transport failures are passed through unchanged.

use crate::command::{Command, Reply};
use crate::error::ScriptError;
use crate::transport::ScriptTransport;

/// Marker the store embeds in a reply when it refuses a script.
const ERROR_MARKER: &str = "ERR";

/// Ask the store whether it already caches a script with `hash`.
pub async fn script_exists(
    transport: &dyn ScriptTransport,
    hash: &str,
) -> Result<bool, ScriptError> {
    let reply = exec_one(transport, Command::script_exists(&[hash])).await?;

    match reply {
        // `SCRIPT EXISTS` answers with one integer per hash asked about.
        Reply::Array(items) => Ok(matches!(items.first(), Some(Reply::Integer(1)))),
        Reply::Integer(n) => Ok(n == 1),
        Reply::Error(message) => Err(ScriptError::Rejected(message)),
        other => Err(ScriptError::UnexpectedReply(format!("{other:?}"))),
    }
}

/// Upload a script body and return the hash the store assigned to it.
///
/// A reply carrying the error marker counts as a rejection even though
/// the batch itself went through.
pub async fn script_load(
    transport: &dyn ScriptTransport,
    source: &str,
) -> Result<String, ScriptError> {
    let reply = exec_one(transport, Command::script_load(source)).await?;

    if let Some(text) = reply.as_text() {
        if text.contains(ERROR_MARKER) {
            return Err(ScriptError::Rejected(text.to_string()));
        }
        return Ok(text.to_string());
    }

    match reply {
        Reply::Error(message) => Err(ScriptError::Rejected(message)),
        other => Err(ScriptError::UnexpectedReply(format!("{other:?}"))),
    }
}

// ---- private helpers ----

/// Run a single-command batch and take its only reply.
async fn exec_one(transport: &dyn ScriptTransport, command: Command) -> Result<Reply, ScriptError> {
    let name = command.name();
    let replies = transport.exec(vec![command]).await?;
    tracing::trace!(command = %name, replies = replies.len(), "Batch executed");

    replies
        .into_iter()
        .next()
        .ok_or_else(|| ScriptError::UnexpectedReply(format!("empty reply to {name}")))
}
