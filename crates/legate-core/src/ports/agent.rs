//! Agent collaborator port.

use async_trait::async_trait;

use crate::domain::errors::AgentError;
use crate::domain::spec::TaskSpec;
use crate::domain::tool::Tool;

/// External capability that turns a task into a raw textual result.
///
/// The engine invokes `execute` exactly once per execution and performs no
/// retries; retry policy, if any, belongs to the implementation or a higher
/// orchestration layer. The returned string is treated as untrusted text;
/// there is no structural contract on its content.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Identity recorded in task provenance.
    fn role(&self) -> &str;

    async fn execute(
        &self,
        spec: &TaskSpec,
        context: Option<&str>,
        tools: &[Tool],
    ) -> Result<String, AgentError>;
}
