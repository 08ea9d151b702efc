//! Tenant context propagation into the store.
//!
//! [`bind`] is the only way to obtain a [`BoundTransaction`], and every
//! table read or write in the engine takes one. A transaction therefore
//! cannot touch tenant data before the caller's tenant and user have been
//! written into its session variables.
//!
//! The variables are transaction-local: they vanish at commit or rollback,
//! so a pooled connection never carries one request's tenant into the next.

use tracing::{debug, warn};

use super::TenantContext;
use crate::core::StoreTransaction;
use crate::error::{AccessError, StorageResult};

/// Session variable read by the store's row policies.
pub const TENANT_SETTING: &str = "app.current_tenant";

/// Session variable recording the acting user.
pub const USER_SETTING: &str = "app.current_user";

/// A store transaction with the caller's tenant context applied.
#[derive(Debug)]
pub struct BoundTransaction<T> {
    tx: T,
    context: TenantContext,
}

impl<T: StoreTransaction> BoundTransaction<T> {
    /// Returns the context this transaction is bound to.
    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    /// Returns the underlying transaction.
    pub fn transaction(&mut self) -> &mut T {
        &mut self.tx
    }

    /// Commits the transaction.
    pub async fn commit(self) -> StorageResult<()> {
        self.tx.commit().await
    }

    /// Rolls back the transaction, logging rather than returning a failure.
    pub async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            warn!(
                tenant = %self.context.tenant_id(),
                error = %e,
                "Rollback failed; connection will be discarded"
            );
        }
    }
}

/// Binds a tenant context to a fresh transaction.
///
/// Sets [`TENANT_SETTING`] and [`USER_SETTING`] for the remainder of the
/// transaction. Must run once per request, before any table is read or
/// written. On failure the transaction is rolled back and consumed.
pub async fn bind<T: StoreTransaction>(
    mut tx: T,
    context: &TenantContext,
) -> StorageResult<BoundTransaction<T>> {
    if context.tenant_id().is_blank() {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Rollback after refused binding failed");
        }
        return Err(AccessError::SecurityContextMissing.into());
    }

    let applied = apply(&mut tx, context).await;
    if let Err(e) = applied {
        if let Err(rollback_err) = tx.rollback().await {
            warn!(error = %rollback_err, "Rollback after failed binding failed");
        }
        return Err(e);
    }

    debug!(
        tenant = %context.tenant_id(),
        user = %context.user_id(),
        "Bound tenant context to transaction"
    );

    Ok(BoundTransaction {
        tx,
        context: context.clone(),
    })
}

async fn apply<T: StoreTransaction>(tx: &mut T, context: &TenantContext) -> StorageResult<()> {
    tx.set_session_variable(TENANT_SETTING, context.tenant_id().as_str())
        .await?;
    tx.set_session_variable(USER_SETTING, context.user_id().as_str())
        .await
}
