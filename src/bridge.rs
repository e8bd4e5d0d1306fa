use crate::chat::helpers::truncate;
use crate::error::ExecutionError;
use crate::host::Host;
use crate::models::GeneratedCode;

/// Hands generated scripts to the host interpreter.
pub struct ExecutionBridge<'a> {
    host: &'a dyn Host,
}

impl<'a> ExecutionBridge<'a> {
    pub fn new(host: &'a dyn Host) -> Self {
        Self { host }
    }

    pub fn execute(&self, code: &GeneratedCode) -> Result<(), ExecutionError> {
        if code.source_text.trim().is_empty() {
            return Err(ExecutionError::new("No code to execute"));
        }
        tracing::info!(
            message_id = %code.extracted_from,
            lines = code.source_text.lines().count(),
            "executing generated code"
        );
        match self.host.run_script(&code.source_text) {
            Ok(()) => {
                tracing::info!(message_id = %code.extracted_from, "code executed successfully");
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    message_id = %code.extracted_from,
                    error = %truncate(&err.message, 500),
                    "generated code raised an error"
                );
                Err(err)
            }
        }
    }
}
