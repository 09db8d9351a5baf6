//! Posting a generated reply, with precondition checks and error classification.

use crate::error::{ReplyError, Result};
use crate::social::client::{PlatformApiError, PlatformClient};
use tracing::{info, warn};

/// Verify the credentials can post, then publish `content` as a reply to
/// `target_id`. Returns the platform-assigned id of the new reply.
///
/// Unauthorized maps to [`ReplyError::Auth`], forbidden (or a reported
/// read-only access level) to [`ReplyError::Permission`], anything else to
/// [`ReplyError::Platform`]. Nothing is retried.
pub async fn post_reply(
    client: &dyn PlatformClient,
    content: &str,
    target_id: &str,
) -> Result<String> {
    let identity = client.me().await.map_err(classify)?;

    if let Some(level) = identity.access_level {
        if !level.can_write() {
            warn!("Account @{} has {:?} access only", identity.username, level);
            return Err(ReplyError::Permission(format!(
                "write permissions required: account @{} is authorized for read-only access; \
                 regenerate the access token with Read and Write permissions",
                identity.username
            )));
        }
    }

    info!("Posting reply to {} as @{}", target_id, identity.username);
    let reply_id = client
        .create_reply(target_id, content)
        .await
        .map_err(classify)?;

    info!("Successfully posted reply {}", reply_id);
    Ok(reply_id)
}

fn classify(err: PlatformApiError) -> ReplyError {
    match err {
        PlatformApiError::Unauthorized(detail) => ReplyError::Auth(format!(
            "invalid credentials: X rejected the consumer key/secret or access token/secret ({detail})"
        )),
        PlatformApiError::Forbidden(detail) => ReplyError::Permission(format!(
            "write permissions required: the access token may not post replies ({detail})"
        )),
        PlatformApiError::Api { status, message } => ReplyError::Platform { status, message },
        PlatformApiError::Transport(message) | PlatformApiError::Parse(message) => {
            ReplyError::Platform { status: 0, message }
        }
    }
}
