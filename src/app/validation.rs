use anyhow::{Context, Result, bail};
use soch_download::{Action, KeyStatus, SearchClient};
use tracing::debug;

/// Resolves the action name and its arguments to a search predicate.
pub(crate) fn resolve_predicate(
    action: &str,
    institution: Option<&str>,
    query: Option<&str>,
) -> Result<String> {
    let action: Action = action.parse()?;
    let predicate = action.predicate(institution, query)?;
    debug!(%action, %predicate, "resolved search predicate");
    Ok(predicate)
}

/// Fails unless the service accepts the client's API key.
pub(crate) async fn ensure_valid_key(client: &SearchClient) -> Result<()> {
    let status = client
        .validate_key()
        .await
        .context("could not reach SOCH to validate the API key")?;
    match status {
        KeyStatus::Valid => Ok(()),
        KeyStatus::Invalid { reason } => bail!("Bad API key ({reason})"),
    }
}
