//! `atvremote` subprocess wrapper

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{interpret_power_output, PlayerPowerState, PowerQuery, Protocol};
use crate::config::PlayerConfig;
use crate::retry::Probe;

/// Runs `atvremote --id <id> [--address <ip>] --protocol <p> power_state`
///
/// Each query is a fresh process bounded by `timeout`. Timeouts and non-zero
/// exits are inconclusive, never fatal; stderr is discarded so pyatv's asyncio
/// tracebacks stay out of the journal.
#[derive(Debug, Clone)]
pub struct AtvRemote {
    program: String,
    prefix_args: Vec<String>,
    id: String,
    address: Option<String>,
    timeout: Duration,
}

impl AtvRemote {
    pub fn new(
        program: impl Into<String>,
        prefix_args: Vec<String>,
        id: impl Into<String>,
        address: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            prefix_args,
            id: id.into(),
            address: address.filter(|a| !a.is_empty()),
            timeout,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.command_args.clone(),
            config.id.clone(),
            config.address.clone(),
            Duration::from_secs(config.query_timeout_secs),
        )
    }

    /// Full argument list for one query (prefix args included)
    pub fn args_for(&self, protocol: Protocol) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.push("--id".to_string());
        args.push(self.id.clone());
        // A known address skips network discovery, which is the flaky part
        if let Some(address) = &self.address {
            args.push("--address".to_string());
            args.push(address.clone());
        }
        args.push("--protocol".to_string());
        args.push(protocol.as_str().to_string());
        args.push("power_state".to_string());
        args
    }
}

#[async_trait]
impl PowerQuery for AtvRemote {
    async fn query(&self, protocol: Protocol) -> Probe<PlayerPowerState> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(protocol))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Probe::Transport(format!("failed to run {}: {}", self.program, e));
            }
            Err(_) => {
                return Probe::Inconclusive(format!("timed out after {:?}", self.timeout));
            }
        };

        if !output.status.success() {
            debug!("atvremote ({}) exited with {}", protocol, output.status);
            return Probe::Inconclusive(format!("exit status {}", output.status));
        }

        interpret_power_output(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str, timeout: Duration) -> AtvRemote {
        // `sh -c <script> <$0> ...` swallows the atvremote arguments
        AtvRemote::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "atvremote".to_string()],
            "ATV-ID",
            None,
            timeout,
        )
    }

    #[test]
    fn test_args_with_address() {
        let remote = AtvRemote::new(
            "atvremote",
            vec![],
            "AA:BB",
            Some("192.168.1.20".to_string()),
            Duration::from_secs(5),
        );
        assert_eq!(
            remote.args_for(Protocol::Companion),
            vec![
                "--id",
                "AA:BB",
                "--address",
                "192.168.1.20",
                "--protocol",
                "companion",
                "power_state"
            ]
        );
    }

    #[test]
    fn test_args_with_prefix_and_no_address() {
        let remote = AtvRemote::new(
            "python3",
            vec!["-m".to_string(), "pyatv.scripts.atvremote".to_string()],
            "AA:BB",
            Some(String::new()),
            Duration::from_secs(5),
        );
        assert_eq!(
            remote.args_for(Protocol::Airplay),
            vec![
                "-m",
                "pyatv.scripts.atvremote",
                "--id",
                "AA:BB",
                "--protocol",
                "airplay",
                "power_state"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_reads_stdout() {
        let remote = shell("echo PowerState.On", Duration::from_secs(5));
        assert_eq!(
            remote.query(Protocol::Companion).await,
            Probe::Value(PlayerPowerState::On)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_inconclusive() {
        let remote = shell("echo PowerState.On; exit 3", Duration::from_secs(5));
        assert!(matches!(
            remote.query(Protocol::Companion).await,
            Probe::Inconclusive(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_inconclusive() {
        let remote = shell("sleep 5", Duration::from_millis(100));
        assert!(matches!(
            remote.query(Protocol::Airplay).await,
            Probe::Inconclusive(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_transport_error() {
        let remote = AtvRemote::new(
            "definitely-not-atvremote-4f1c",
            vec![],
            "ATV-ID",
            None,
            Duration::from_secs(5),
        );
        assert!(matches!(
            remote.query(Protocol::Companion).await,
            Probe::Transport(_)
        ));
    }
}
