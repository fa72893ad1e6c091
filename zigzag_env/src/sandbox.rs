//! Capability sandbox for untrusted robot logic.
//!
//! Robot logic has no ambient authority: every sensitive operation it may
//! want (files, processes, sockets, exiting, introspection) goes through a
//! `Sandbox` handle, which checks the run's `SecurityPolicy` first.
//!
//! - File reads: the harness's own artifacts plus the designated input file
//! - File writes: the designated output file only
//! - Command execution, thread spawning, exiting: always denied
//! - Replacing the policy: always denied
//! - Network: a single configured `host:port`, none by default
//! - Introspection: a named allow-list of harness types
//!
//! A denial is returned as `EnvError::PermissionDenied` *and* recorded on the
//! `RunContext`, so swallowing the error does not make the run legal again.
//!
//! Once the run is cancelled every operation is refused without being
//! recorded, and once the harness seals the output the output file is
//! no longer writable from logic.

use crate::context::RunContext;
use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// File names of the harness's own artifacts that logic may read.
pub const DEFAULT_ARTIFACTS: &[&str] = &[
    "zigzag-sim",
    "libzigzag_core.rlib",
    "libzigzag_env.rlib",
    "libzigzag_sim.rlib",
    "robot.rs",
];

/// Harness types logic may introspect, with a one-line description each.
pub const REFLECTABLE_SYMBOLS: &[(&str, &str)] = &[
    ("RobotController", "agent control API bound to the run's maze"),
    ("SensorReading", "WALL | SPACE | GOAL"),
    ("Heading", "agent orientation, 0-3 clockwise from north"),
    ("MoveOutcome", "MOVED | BLOCKED"),
];

/// The only network endpoint logic may talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn matches(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Allow-lists checked for every sensitive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// File names (not paths) of readable harness artifacts
    pub readable_artifacts: Vec<String>,

    /// The designated input file
    pub input_file: Option<PathBuf>,

    /// The designated output file
    pub output_file: Option<PathBuf>,

    /// Single endpoint allowed for connect/accept
    pub allowed_endpoint: Option<Endpoint>,

    /// Type names that may be introspected
    pub reflectable: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            readable_artifacts: DEFAULT_ARTIFACTS.iter().map(|s| s.to_string()).collect(),
            input_file: None,
            output_file: None,
            allowed_endpoint: None,
            reflectable: REFLECTABLE_SYMBOLS.iter().map(|(name, _)| name.to_string()).collect(),
        }
    }
}

impl SecurityPolicy {
    /// Policy for a job with the given input and output files.
    pub fn for_job(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input_file: Some(input.into()),
            output_file: Some(output.into()),
            ..Self::default()
        }
    }

    /// Allows connect/accept on one endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.allowed_endpoint = Some(endpoint);
        self
    }

    /// Adds a readable artifact file name.
    pub fn with_artifact(mut self, name: impl Into<String>) -> Self {
        self.readable_artifacts.push(name.into());
        self
    }

    pub fn check_read(&self, path: &Path) -> Result<(), EnvError> {
        let is_input = self
            .input_file
            .as_deref()
            .is_some_and(|input| same_path(input, path));
        let is_artifact = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.readable_artifacts.iter().any(|a| a == name));

        if is_input || is_artifact {
            Ok(())
        } else {
            Err(EnvError::denied("read", path.display()))
        }
    }

    pub fn check_write(&self, path: &Path) -> Result<(), EnvError> {
        match self.output_file.as_deref() {
            Some(output) if same_path(output, path) => Ok(()),
            _ => Err(EnvError::denied("write", path.display())),
        }
    }

    pub fn check_exec(&self, command: &str) -> Result<(), EnvError> {
        Err(EnvError::denied("exec", command))
    }

    pub fn check_spawn(&self, name: &str) -> Result<(), EnvError> {
        Err(EnvError::denied("spawn", name))
    }

    pub fn check_exit(&self, status: i32) -> Result<(), EnvError> {
        Err(EnvError::denied("exit", format!("exit({})", status)))
    }

    pub fn check_policy_install(&self) -> Result<(), EnvError> {
        Err(EnvError::denied("install-policy", "sandbox"))
    }

    pub fn check_connect(&self, host: &str, port: u16) -> Result<(), EnvError> {
        match &self.allowed_endpoint {
            Some(endpoint) if endpoint.matches(host, port) => Ok(()),
            _ => Err(EnvError::denied("connect", format!("{}:{}", host, port))),
        }
    }

    pub fn check_accept(&self, host: &str, port: u16) -> Result<(), EnvError> {
        match &self.allowed_endpoint {
            Some(endpoint) if endpoint.matches(host, port) => Ok(()),
            _ => Err(EnvError::denied("accept", format!("{}:{}", host, port))),
        }
    }

    pub fn check_reflect(&self, symbol: &str) -> Result<(), EnvError> {
        if self.reflectable.iter().any(|s| s == symbol) {
            Ok(())
        } else {
            Err(EnvError::denied("reflect", symbol))
        }
    }
}

/// Compares paths literally, then by canonical form when both exist.
fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Handle through which robot logic performs sensitive operations.
#[derive(Debug, Clone)]
pub struct Sandbox {
    policy: Arc<SecurityPolicy>,
    context: RunContext,
}

impl Sandbox {
    /// Creates a sandbox enforcing `policy` for the run behind `context`.
    pub fn new(policy: SecurityPolicy, context: RunContext) -> Self {
        Self {
            policy: Arc::new(policy),
            context,
        }
    }

    /// Returns the enforced policy.
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Passes a check result through, logging and recording denials.
    /// A cancelled run gets nothing, whatever the policy says.
    fn enforce(&self, capability: &str, check: Result<(), EnvError>) -> Result<(), EnvError> {
        if self.context.is_cancelled() {
            return Err(EnvError::denied(capability, "cancelled run"));
        }
        if let Err(err) = &check {
            warn!(run = %self.context.run_id(), "Sandbox violation: {}", err);
            self.context.record_violation(err);
        }
        check
    }

    /// Reads a whole file if the policy allows it.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String, EnvError> {
        let path = path.as_ref();
        self.enforce("read", self.policy.check_read(path))?;
        fs::read_to_string(path).map_err(EnvError::channel)
    }

    /// Writes a whole file if the policy allows it.
    pub fn write(&self, path: impl AsRef<Path>, contents: &str) -> Result<(), EnvError> {
        let path = path.as_ref();
        self.enforce("write", self.policy.check_write(path))?;
        self.context
            .write_output(|| fs::write(path, contents).map_err(EnvError::channel))
    }

    /// Runs a shell command. Always denied.
    pub fn exec(&self, command: &str) -> Result<(), EnvError> {
        self.enforce("exec", self.policy.check_exec(command))
    }

    /// Starts a new thread of execution. Always denied.
    pub fn spawn(&self, name: &str) -> Result<(), EnvError> {
        self.enforce("spawn", self.policy.check_spawn(name))
    }

    /// Terminates the host process. Always denied.
    pub fn exit(&self, status: i32) -> Result<(), EnvError> {
        self.enforce("exit", self.policy.check_exit(status))
    }

    /// Replaces the enforced policy. Always denied.
    pub fn install_policy(&self, _policy: SecurityPolicy) -> Result<(), EnvError> {
        self.enforce("install-policy", self.policy.check_policy_install())
    }

    /// Opens a TCP connection if the endpoint is allowed.
    pub fn connect(&self, host: &str, port: u16) -> Result<TcpStream, EnvError> {
        self.enforce("connect", self.policy.check_connect(host, port))?;
        TcpStream::connect((host, port)).map_err(EnvError::channel)
    }

    /// Binds a TCP listener if the endpoint is allowed.
    pub fn listen(&self, host: &str, port: u16) -> Result<TcpListener, EnvError> {
        self.enforce("accept", self.policy.check_accept(host, port))?;
        TcpListener::bind((host, port)).map_err(EnvError::channel)
    }

    /// Describes a harness type if it is on the introspection allow-list.
    pub fn reflect(&self, symbol: &str) -> Result<&'static str, EnvError> {
        self.enforce("reflect", self.policy.check_reflect(symbol))?;
        REFLECTABLE_SYMBOLS
            .iter()
            .find(|(name, _)| *name == symbol)
            .map(|(_, description)| *description)
            .ok_or_else(|| EnvError::denied("reflect", symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_for(dir: &Path) -> (Sandbox, RunContext) {
        let ctx = RunContext::new(0);
        let policy = SecurityPolicy::for_job(dir.join("simservicein.txt"), dir.join("simserviceout.txt"));
        (Sandbox::new(policy, ctx.clone()), ctx)
    }

    #[test]
    fn test_input_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("simservicein.txt"), "1 1\n1\n").unwrap();
        let (sandbox, ctx) = sandbox_for(dir.path());

        let text = sandbox.read_to_string(dir.path().join("simservicein.txt")).unwrap();
        assert_eq!(text, "1 1\n1\n");
        assert!(!ctx.has_violation());
    }

    #[test]
    fn test_other_reads_are_denied_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (sandbox, ctx) = sandbox_for(dir.path());

        let err = sandbox.read_to_string("/etc/passwd").unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(ctx.violation(), Some(EnvError::denied("read", "/etc/passwd")));
    }

    #[test]
    fn test_artifacts_match_by_file_name() {
        let policy = SecurityPolicy::default();
        assert!(policy.check_read(Path::new("/app/bin/zigzag-sim")).is_ok());
        assert!(policy.check_read(Path::new("/app/bin/zigzag-sim.bak")).is_err());
    }

    #[test]
    fn test_only_output_file_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let (sandbox, _ctx) = sandbox_for(dir.path());

        assert!(sandbox.write(dir.path().join("simserviceout.txt"), "0 0 0\n").is_ok());
        assert!(sandbox.write(dir.path().join("other.txt"), "x").is_err());
    }

    #[test]
    fn test_process_control_is_always_denied() {
        let ctx = RunContext::new(0);
        let sandbox = Sandbox::new(SecurityPolicy::default(), ctx.clone());

        assert!(sandbox.exec("ls").is_err());
        assert!(sandbox.spawn("worker").is_err());
        assert!(sandbox.exit(0).is_err());
        assert!(sandbox.install_policy(SecurityPolicy::default()).is_err());

        // Only the first denial is kept for the verdict
        assert_eq!(ctx.violation(), Some(EnvError::denied("exec", "ls")));
    }

    #[test]
    fn test_network_denied_without_endpoint() {
        let policy = SecurityPolicy::default();
        assert!(policy.check_connect("example.com", 80).is_err());
        assert!(policy.check_accept("", 80).is_err());

        let policy = policy.with_endpoint(Endpoint::new("grader.local", 8080));
        assert!(policy.check_connect("grader.local", 8080).is_ok());
        assert!(policy.check_connect("grader.local", 8081).is_err());
        assert!(policy.check_accept("grader.local", 8080).is_ok());
    }

    #[test]
    fn test_reflect_allow_list() {
        let sandbox = Sandbox::new(SecurityPolicy::default(), RunContext::new(0));

        assert_eq!(sandbox.reflect("SensorReading").unwrap(), "WALL | SPACE | GOAL");
        assert!(sandbox.reflect("Maze").is_err());
    }

    #[test]
    fn test_cancelled_run_gets_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("simservicein.txt");
        fs::write(&input, "1 1\n1\n").unwrap();
        let (sandbox, ctx) = sandbox_for(dir.path());

        ctx.cancel();
        assert!(sandbox.read_to_string(&input).is_err());
        assert!(sandbox.write(dir.path().join("simserviceout.txt"), "0 0 0\n").is_err());
        assert!(!dir.path().join("simserviceout.txt").exists());
        assert!(!ctx.has_violation());
    }

    #[test]
    fn test_sealed_output_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("simserviceout.txt");
        let (sandbox, ctx) = sandbox_for(dir.path());

        ctx.seal_output();
        let err = sandbox.write(&output, "1 (Successfully ended on goal)\n").unwrap_err();
        assert_eq!(err, EnvError::denied("write", "sealed output"));
        assert!(!output.exists());
    }
}
