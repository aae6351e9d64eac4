// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Running commands inside cluster containers, with retries on infrastructure noise.
//!
//! Executing inside a node's container can fail spuriously: the container may be
//! restarting ("container not found") or the exec stream may drop. Those failures
//! are reported as transient [`ExecError`] variants and retried. A command that
//! ran and failed is a real result and is never retried.

use crate::errors::{classify_message, Classify, ExecError, RetryError};
use crate::retry::{retry_classified, RetryPolicy};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams};
use kube::client::UpgradeConnectionError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Something that can run a command and return its standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` (argv form) to completion.
    async fn run(&self, command: &[String]) -> Result<String, ExecError>;
}

/// Wrap a shell snippet as `sh -c <snippet>`.
#[must_use]
pub fn shell(snippet: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), snippet.to_string()]
}

/// Wrap a shell snippet so it runs in the host filesystem of a privileged pod
/// that mounts the node root at `/host`.
#[must_use]
pub fn host_shell(snippet: &str) -> Vec<String> {
    vec![
        "chroot".to_string(),
        "/host".to_string(),
        "sh".to_string(),
        "-c".to_string(),
        snippet.to_string(),
    ]
}

/// Runs commands through the pod `exec` subresource.
pub struct PodExecRunner {
    pods: Api<Pod>,
    pod: String,
    container: Option<String>,
}

impl PodExecRunner {
    /// Create a runner for a pod; `container` may be omitted for single-container pods.
    #[must_use]
    pub fn new(pods: Api<Pod>, pod: impl Into<String>, container: Option<String>) -> Self {
        Self {
            pods,
            pod: pod.into(),
            container,
        }
    }

    fn container_name(&self) -> String {
        self.container.clone().unwrap_or_default()
    }

    fn map_exec_error(&self, err: kube::Error) -> ExecError {
        match &err {
            // Exec refusals arrive as the status of the failed websocket upgrade
            kube::Error::UpgradeConnection(UpgradeConnectionError::ProtocolSwitch(status)) => {
                match status.as_u16() {
                    404 => ExecError::ContainerNotFound {
                        pod: self.pod.clone(),
                        container: self.container_name(),
                    },
                    429 => ExecError::Stream(err.to_string()),
                    400..=499 => ExecError::Rejected(err.to_string()),
                    _ => ExecError::Stream(err.to_string()),
                }
            }
            kube::Error::Api(api_err) if api_err.code == 404 => ExecError::ContainerNotFound {
                pod: self.pod.clone(),
                container: self.container_name(),
            },
            kube::Error::Api(_) if !err.class().is_transient() => ExecError::Rejected(err.to_string()),
            // Transport failures and broken upgrades
            _ => ExecError::Stream(err.to_string()),
        }
    }
}

#[async_trait]
impl CommandRunner for PodExecRunner {
    async fn run(&self, command: &[String]) -> Result<String, ExecError> {
        let mut params = AttachParams::default().stdin(false).stdout(true).stderr(true);
        if let Some(container) = &self.container {
            params = params.container(container.clone());
        }

        debug!(pod = %self.pod, container = ?self.container, command = ?command, "Executing command in container");

        let mut attached = self
            .pods
            .exec(&self.pod, command.to_vec(), &params)
            .await
            .map_err(|e| self.map_exec_error(e))?;

        let (stdout, stderr) = tokio::join!(read_stream(attached.stdout()), read_stream(attached.stderr()));
        let stdout = stdout.map_err(|e| ExecError::Stream(e.to_string()))?;
        let stderr = stderr.map_err(|e| ExecError::Stream(e.to_string()))?;

        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };

        attached
            .join()
            .await
            .map_err(|e| ExecError::Stream(e.to_string()))?;

        check_exit_status(&command.join(" "), status.as_ref(), &stderr)?;
        Ok(stdout)
    }
}

/// Read a whole output stream. Non-UTF-8 output is kept lossily.
pub(crate) async fn read_stream<R>(reader: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut output = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut output).await?;
    }
    Ok(String::from_utf8_lossy(&output).into_owned())
}

/// Interpret the status object the API server sends when an exec session ends.
///
/// No status is treated as success. A failure whose message is known
/// infrastructure noise is transient; anything else means the command failed.
///
/// # Errors
///
/// Returns [`ExecError::Stream`] for transient failures and
/// [`ExecError::CommandFailed`] otherwise.
pub fn check_exit_status(command: &str, status: Option<&Status>, stderr: &str) -> Result<(), ExecError> {
    let Some(status) = status else {
        return Ok(());
    };

    if status.status.as_deref() != Some("Failure") {
        return Ok(());
    }

    let message = status.message.clone().unwrap_or_default();
    if classify_message(&message).is_transient() {
        return Err(ExecError::Stream(message));
    }

    let stderr = stderr.trim();
    Err(ExecError::CommandFailed {
        command: command.to_string(),
        message: if stderr.is_empty() {
            message
        } else {
            format!("{message}: {stderr}")
        },
    })
}

/// Run a command, retrying while it fails with transient exec errors.
///
/// # Errors
///
/// - [`RetryError::Permanent`] if the command failed or the request was rejected
/// - [`RetryError::Exhausted`] ("ran out of N retries") if every attempt hit
///   infrastructure noise
///
/// # Example
///
/// ```rust,no_run
/// use ranwait::exec::{exec_with_retries, host_shell, PodExecRunner};
/// use ranwait::retry::RetryPolicy;
/// use k8s_openapi::api::core::v1::Pod;
/// use kube::Api;
/// use std::time::Duration;
///
/// # async fn example(client: kube::Client) -> anyhow::Result<()> {
/// let pods: Api<Pod> = Api::namespaced(client, "openshift-machine-config-operator");
/// let runner = PodExecRunner::new(pods, "machine-config-daemon-abcde", Some("machine-config-daemon".into()));
/// let policy = RetryPolicy::new(3, Duration::from_secs(10))?;
///
/// let kernel = exec_with_retries(&runner, &host_shell("uname -r"), &policy).await?;
/// # Ok(())
/// # }
/// ```
pub async fn exec_with_retries<R>(
    runner: &R,
    command: &[String],
    policy: &RetryPolicy,
) -> Result<String, RetryError<ExecError>>
where
    R: CommandRunner + ?Sized,
{
    let operation = format!("exec {}", command.join(" "));
    retry_classified(policy, &operation, || runner.run(command)).await
}
