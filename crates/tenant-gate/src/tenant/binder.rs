//! Binds a request identity to the current database transaction

use async_trait::async_trait;

use super::escape::{quote_identifier, quote_literal};
use crate::auth::Claims;
use crate::constants::{AUTHENTICATED_ROLE, CLAIM_EMAIL_SETTING, CLAIM_SUB_SETTING};
use crate::error::{Error, Result};

/// Executes raw session statements inside an open transaction
#[async_trait]
pub trait SessionExecutor: Send + Sync {
    async fn execute_statement(&self, sql: &str) -> Result<()>;
}

#[async_trait]
impl SessionExecutor for tokio_postgres::Transaction<'_> {
    async fn execute_statement(&self, sql: &str) -> Result<()> {
        self.batch_execute(sql).await.map_err(Error::from)
    }
}

/// Statements that scope `claims` to the current transaction.
///
/// Every statement is `SET LOCAL`, so the settings vanish at commit or
/// rollback and never leak to the next user of a pooled connection.
pub fn session_statements(claims: &Claims) -> [String; 3] {
    [
        format!("SET LOCAL ROLE {}", quote_identifier(AUTHENTICATED_ROLE)),
        format!(
            "SET LOCAL {CLAIM_SUB_SETTING} = {}",
            quote_literal(&claims.sub)
        ),
        format!(
            "SET LOCAL {CLAIM_EMAIL_SETTING} = {}",
            quote_literal(&claims.email)
        ),
    ]
}

/// Switch the transaction to the authenticated role and expose the caller's
/// identity to row-level security policies.
///
/// Without claims nothing is executed and the transaction keeps the
/// connection's default role, which row-level policies deny by default.
/// The first failing statement aborts binding; the caller must roll back.
pub async fn bind_claims<E>(executor: &E, claims: Option<&Claims>) -> Result<()>
where
    E: SessionExecutor + ?Sized,
{
    let Some(claims) = claims else {
        tracing::trace!("No claims, transaction keeps default role");
        return Ok(());
    };

    for statement in session_statements(claims) {
        executor.execute_statement(&statement).await?;
    }

    tracing::trace!(sub = %claims.sub, "Claims bound to transaction");
    Ok(())
}
