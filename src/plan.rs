use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo::User;

/// Free-tier monthly allowance of AI generations.
pub const FREE_MONTHLY_LIMIT: i32 = 3;

/// Sentinel returned for premium users; the plan is effectively unbounded.
pub const PREMIUM_REMAINING: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

/// How many generations are left this month for the given plan and counter.
pub fn remaining(plan: Plan, used_this_month: i32) -> i32 {
    match plan {
        Plan::Premium => PREMIUM_REMAINING,
        Plan::Free => (FREE_MONTHLY_LIMIT - used_this_month).max(0),
    }
}

/// Whether a quota-consuming action may proceed.
pub fn may_consume(plan: Plan, used_this_month: i32) -> bool {
    remaining(plan, used_this_month) > 0
}

/// Records a completed generation against the caller's monthly allowance.
/// Handlers only see this trait so tests can observe the side effect.
#[async_trait]
pub trait UsageMeter: Send + Sync {
    async fn record_generation(&self, user_id: Uuid) -> anyhow::Result<()>;
}

pub struct PgUsageMeter {
    db: PgPool,
}

impl PgUsageMeter {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageMeter for PgUsageMeter {
    async fn record_generation(&self, user_id: Uuid) -> anyhow::Result<()> {
        User::increment_monthly_count(&self.db, user_id).await?;
        Ok(())
    }
}

/// In-memory meter used by `AppState::fake()` and unit tests.
#[derive(Default)]
pub struct CountingMeter {
    recorded: AtomicU32,
}

impl CountingMeter {
    pub fn recorded(&self) -> u32 {
        self.recorded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UsageMeter for CountingMeter {
    async fn record_generation(&self, _user_id: Uuid) -> anyhow::Result<()> {
        self.recorded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
