//! agentctl library
//!
//! Configuration, telemetry and the subcommands of the `agentctl` binary,
//! which drives organization analysis and agent generation against the
//! REST backend.

pub mod commands;
pub mod config;
pub mod telemetry;

use agent_core::AgentError;

pub use commands::FollowUp;
pub use config::Config;
pub use telemetry::init_telemetry;

pub const EXIT_SUCCESS: i32 = 0;
/// Bad configuration or invalid input
pub const EXIT_CONFIG: i32 = 1;
/// The backend job failed, timed out or was cancelled
pub const EXIT_JOB_FAILED: i32 = 2;
/// The backend could not be reached or answered unexpectedly
pub const EXIT_TRANSPORT: i32 = 3;
pub const EXIT_INTERRUPTED: i32 = 130;

/// Process exit code for a failed command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let Some(agent_error) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AgentError>())
    else {
        return EXIT_CONFIG;
    };

    match agent_error {
        AgentError::Validation(_) | AgentError::Configuration(_) => EXIT_CONFIG,
        AgentError::ServerReported(_) | AgentError::Timeout { .. } | AgentError::InvalidState(_) => {
            EXIT_JOB_FAILED
        }
        AgentError::Network(_)
        | AgentError::Http { .. }
        | AgentError::Unauthorized(_)
        | AgentError::Protocol(_)
        | AgentError::Internal(_) => EXIT_TRANSPORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::JobId;
    use anyhow::Context;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        let code = |err: AgentError| exit_code(&anyhow::Error::from(err));

        assert_eq!(code(AgentError::Validation("bad".into())), EXIT_CONFIG);
        assert_eq!(code(AgentError::server_reported("boom")), EXIT_JOB_FAILED);
        assert_eq!(
            code(AgentError::Timeout {
                job_id: JobId::from("a1"),
                attempts: 3,
                elapsed: Duration::from_secs(5),
            }),
            EXIT_JOB_FAILED
        );
        assert_eq!(code(AgentError::Network("refused".into())), EXIT_TRANSPORT);
        assert_eq!(code(AgentError::http(500, "oops")), EXIT_TRANSPORT);
        assert_eq!(code(AgentError::Unauthorized("no session".into())), EXIT_TRANSPORT);
    }

    #[test]
    fn test_exit_code_sees_through_context() {
        let err: Result<(), AgentError> = Err(AgentError::server_reported("boom"));
        let err = err.context("Analysis failed").unwrap_err();
        assert_eq!(exit_code(&err), EXIT_JOB_FAILED);

        assert_eq!(exit_code(&anyhow::anyhow!("unreadable file")), EXIT_CONFIG);
    }
}
