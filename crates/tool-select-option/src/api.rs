use std::sync::Arc;

use action_locator::{Locatable, LocatedControl};
use async_trait::async_trait;
use formfill_core_types::{TokioWaiter, Waiter};
use tracing::debug;

use crate::errors::SelectError;
use crate::model::SelectReport;
use crate::policy::SelectPolicyView;
use crate::runner::{execute, RuntimeDeps};

#[async_trait]
pub trait DropdownFiller: Send + Sync {
    /// Drives the machine for one located control. `candidates` holds the
    /// values to try, preferred first.
    async fn run(
        &self,
        page: &dyn Locatable,
        key: &str,
        located: &LocatedControl,
        candidates: &[String],
    ) -> Result<SelectReport, SelectError>;

    async fn fill(
        &self,
        page: &dyn Locatable,
        key: &str,
        located: &LocatedControl,
        candidates: &[String],
    ) -> bool {
        match self.run(page, key, located, candidates).await {
            Ok(report) => report.ok,
            Err(err) => {
                debug!(field = key, error = %err, "dropdown fill rejected");
                false
            }
        }
    }
}

pub struct SelectToolBuilder {
    policy: SelectPolicyView,
    waiter: Option<Arc<dyn Waiter>>,
}

impl SelectToolBuilder {
    pub fn new(policy: SelectPolicyView) -> Self {
        Self {
            policy,
            waiter: None,
        }
    }

    pub fn with_waiter(mut self, waiter: Arc<dyn Waiter>) -> Self {
        self.waiter = Some(waiter);
        self
    }

    /// Uses the tokio timer when no waiter was given.
    pub fn build(self) -> Arc<dyn DropdownFiller> {
        Arc::new(SelectTool {
            policy: self.policy,
            waiter: self.waiter.unwrap_or_else(|| Arc::new(TokioWaiter)),
        })
    }
}

pub struct SelectTool {
    policy: SelectPolicyView,
    waiter: Arc<dyn Waiter>,
}

impl SelectTool {
    pub fn policy(&self) -> &SelectPolicyView {
        &self.policy
    }
}

#[async_trait]
impl DropdownFiller for SelectTool {
    async fn run(
        &self,
        page: &dyn Locatable,
        key: &str,
        located: &LocatedControl,
        candidates: &[String],
    ) -> Result<SelectReport, SelectError> {
        let runtime = RuntimeDeps {
            page,
            waiter: self.waiter.as_ref(),
            policy: &self.policy,
        };
        execute(key, located, candidates, runtime).await
    }
}
