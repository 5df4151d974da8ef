use anyhow::{Context, Result};

/// Hashes `password` with bcrypt at `cost` on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("Failed to hash password")
}

/// verify_password
///
/// Checks `password` against a stored bcrypt digest on the blocking pool. A digest that
/// bcrypt cannot parse is logged and treated as a mismatch, so a corrupt row reads as bad
/// credentials rather than a server error.
pub async fn verify_password(password: String, digest: String) -> Result<bool> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &digest))
        .await
        .context("password verification task failed")?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "stored password digest could not be parsed");
            Ok(false)
        }
    }
}
