use action_locator::ControlHandle;
use async_trait::async_trait;
use tracing::debug;

use crate::errors::TypeError;
use crate::model::TypeReport;
use crate::policy::TypePolicyView;
use crate::runner::{execute, RuntimeDeps};

#[async_trait]
pub trait TextFiller: Send + Sync {
    async fn run(&self, control: &dyn ControlHandle, value: &str) -> Result<TypeReport, TypeError>;

    /// Writes `value` into the control; false for a blank value or a
    /// control that cannot take it.
    async fn fill(&self, control: &dyn ControlHandle, value: &str) -> bool {
        match self.run(control, value).await {
            Ok(report) => report.ok,
            Err(TypeError::BlankValue) => false,
            Err(err) => {
                debug!(control = %control.token(), error = %err, "text fill failed");
                false
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TypeTextTool {
    policy: TypePolicyView,
}

impl TypeTextTool {
    pub fn new(policy: TypePolicyView) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TypePolicyView {
        &self.policy
    }
}

#[async_trait]
impl TextFiller for TypeTextTool {
    async fn run(&self, control: &dyn ControlHandle, value: &str) -> Result<TypeReport, TypeError> {
        let runtime = RuntimeDeps {
            control,
            policy: &self.policy,
        };
        execute(value, runtime).await
    }
}
