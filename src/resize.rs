// Swap file resize controller
// SPDX-License-Identifier: GPL-3.0-or-later
//
// One resize call walks these phases:
//
//   Idle -> Validating -> CheckingPrivilegeTool -> Disabling -> Done      (target = 0)
//   Idle -> Validating -> CheckingPrivilegeTool -> Disabling -> Recreating
//        -> Formatting -> Enabling -> Done                                (target > 0)
//
// Any phase after Validating may end in Failed. The rebuild runs as a single
// elevated process, so Disabling..Enabling are entered together once that
// process succeeds; a failure inside it is reported as one aggregate error.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::command::{CommandError, CommandExecutor, CommandOutcome, CommandSpec};
use crate::config::ResizerConfig;
use crate::host::Host;
use crate::state::SwapState;
use crate::status::StatusSink;
use crate::swaps::format_mb;

/// `$0` names the script in error messages, `$1` is the swap file, `$2` the size in MB.
const DISABLE_STRICT: &str = "swapoff \"$1\"\n";
const DISABLE_TOLERANT: &str = "swapoff \"$1\" 2>/dev/null || true\n";
const REBUILD_TAIL: &str = "\
dd if=/dev/zero of=\"$1\" bs=1M count=\"$2\"
chmod 600 \"$1\"
mkswap \"$1\"
swapon \"$1\"
";
const SCRIPT_NAME: &str = "swap-resizer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    Idle,
    Validating,
    CheckingPrivilegeTool,
    Disabling,
    Recreating,
    Formatting,
    Enabling,
    Done,
    Failed,
}

/// Which elevated command failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOperation {
    Disable,
    Rebuild,
}

impl fmt::Display for ResizeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeOperation::Disable => f.write_str("disabling swap file"),
            ResizeOperation::Rebuild => f.write_str("rebuilding swap file"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Root access is not possible: {0} not found")]
    PrivilegeUnavailable(String),
    #[error("Failed {operation} (exit code {exit_code}): {stderr}")]
    CommandFailed {
        operation: ResizeOperation,
        exit_code: i32,
        stderr: String,
        /// Refreshed after the failure; swap may be left off
        state: SwapState,
    },
    #[error(transparent)]
    Spawn(#[from] CommandError),
}

impl ResizeError {
    /// State refreshed after a failed command, if one ran
    pub fn state(&self) -> Option<&SwapState> {
        match self {
            ResizeError::CommandFailed { state, .. } => Some(state),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResizeError>;

/// Operator-supplied target size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    pub target_size_mb: i64,
}

impl ResizeRequest {
    pub fn new(target_size_mb: i64) -> Self {
        Self { target_size_mb }
    }
}

/// Successful end states, each carrying the state refreshed afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Disabled(SwapState),
    Resized(SwapState),
}

impl ResizeOutcome {
    pub fn state(&self) -> &SwapState {
        match self {
            ResizeOutcome::Disabled(state) | ResizeOutcome::Resized(state) => state,
        }
    }
}

/// One step of the swap file rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStep {
    Disable,
    Create,
    Restrict,
    Format,
    Enable,
}

impl ResizeStep {
    pub const REBUILD: [ResizeStep; 5] = [
        ResizeStep::Disable,
        ResizeStep::Create,
        ResizeStep::Restrict,
        ResizeStep::Format,
        ResizeStep::Enable,
    ];

    /// Argument vector for this step
    pub fn command(&self, path: &Path, size_mb: u64) -> CommandSpec {
        let path = path.to_string_lossy().into_owned();
        match self {
            ResizeStep::Disable => CommandSpec::new("swapoff").arg(path),
            ResizeStep::Create => CommandSpec::new("dd").args([
                "if=/dev/zero".to_string(),
                format!("of={}", path),
                "bs=1M".to_string(),
                format!("count={}", size_mb),
            ]),
            ResizeStep::Restrict => CommandSpec::new("chmod").args(["600".to_string(), path]),
            ResizeStep::Format => CommandSpec::new("mkswap").arg(path),
            ResizeStep::Enable => CommandSpec::new("swapon").arg(path),
        }
    }

    fn phase(&self) -> ResizePhase {
        match self {
            ResizeStep::Disable => ResizePhase::Disabling,
            ResizeStep::Create | ResizeStep::Restrict => ResizePhase::Recreating,
            ResizeStep::Format => ResizePhase::Formatting,
            ResizeStep::Enable => ResizePhase::Enabling,
        }
    }
}

/// Everything needed to rebuild the swap file at a new size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildPlan {
    pub path: PathBuf,
    pub size_mb: u64,
    /// Fail when swapoff fails. Off when the file is not an active swap area.
    pub strict_disable: bool,
}

impl RebuildPlan {
    /// Per-step argument vectors, in execution order
    pub fn steps(&self) -> Vec<CommandSpec> {
        ResizeStep::REBUILD
            .iter()
            .map(|step| step.command(&self.path, self.size_mb))
            .collect()
    }

    /// Fixed script text; stops at the first failing step
    pub fn script(&self) -> String {
        let disable = if self.strict_disable {
            DISABLE_STRICT
        } else {
            DISABLE_TOLERANT
        };
        format!("set -e\n{}{}", disable, REBUILD_TAIL)
    }

    /// Single elevated invocation. Path and size travel as positional
    /// parameters and never become part of the script text.
    pub fn to_command(&self, helper: &str) -> CommandSpec {
        CommandSpec::new("sh")
            .args([
                "-c".to_string(),
                self.script(),
                SCRIPT_NAME.to_string(),
                self.path.to_string_lossy().into_owned(),
                self.size_mb.to_string(),
            ])
            .elevated(helper)
    }
}

/// Range checks that need no access to the machine.
/// Returns the target as an unsigned size.
pub fn validate_target(target_mb: i64, current_mb: u64, max_size_mb: u64) -> Result<u64> {
    if i64::try_from(current_mb).is_ok_and(|current| current == target_mb) {
        return Err(ResizeError::InvalidInput(format!(
            "swap is already {} MB",
            current_mb
        )));
    }

    let target = u64::try_from(target_mb).map_err(|_| {
        ResizeError::InvalidInput(format!("size must not be negative (got {})", target_mb))
    })?;

    if target > max_size_mb {
        return Err(ResizeError::InvalidInput(format!(
            "{} MB exceeds the maximum of {} MB",
            target, max_size_mb
        )));
    }

    Ok(target)
}

/// Refresh the state and describe it on the status surface
pub fn refresh_with_status<H: Host>(host: &H, sink: &mut dyn StatusSink) -> SwapState {
    sink.info("Refreshing memory values.");
    let capture = host.refresh();
    for warning in &capture.warnings {
        sink.warn(warning);
    }
    let state = capture.state;

    if state.allocated() {
        sink.info("Swap space is allocated.");
    } else {
        sink.info("Swap space is not allocated.");
    }
    debug!(
        "Swap total {} MB (partition {}, file {})",
        state.swap_total_mb(),
        format_mb(state.backing.partition_mb),
        format_mb(state.backing.file_mb)
    );

    sink.info("Memory values updated.");
    state
}

/// Status line for a failed elevated command
fn failure_report(headline: &str, outcome: &CommandOutcome) -> String {
    match outcome.message() {
        "" => format!("{} (exit code {}).", headline, outcome.exit_code),
        message => format!("{}.\n{}", headline, message),
    }
}

/// Drives the disable / recreate / re-enable sequence for the swap file
pub struct SwapResizer<E, H> {
    executor: E,
    host: H,
    config: ResizerConfig,
    phase: ResizePhase,
}

impl<E: CommandExecutor, H: Host> SwapResizer<E, H> {
    pub fn new(executor: E, host: H, config: ResizerConfig) -> Self {
        Self {
            executor,
            host,
            config,
            phase: ResizePhase::Idle,
        }
    }

    pub fn phase(&self) -> ResizePhase {
        self.phase
    }

    /// Fresh state for display
    pub fn refresh(&self, sink: &mut dyn StatusSink) -> SwapState {
        refresh_with_status(&self.host, sink)
    }

    /// Resize (or, for a zero target, disable) the swap file.
    /// `current_swap_total_mb` is the size the operator was shown.
    pub fn resize(
        &mut self,
        request: ResizeRequest,
        current_swap_total_mb: u64,
        sink: &mut dyn StatusSink,
    ) -> Result<ResizeOutcome> {
        let result = self.run(request, current_swap_total_mb, sink);
        match &result {
            Ok(_) => self.enter(ResizePhase::Done),
            Err(ResizeError::InvalidInput(_)) => self.enter(ResizePhase::Idle),
            Err(_) => self.enter(ResizePhase::Failed),
        }
        result
    }

    fn enter(&mut self, phase: ResizePhase) {
        debug!("Resize: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn run(
        &mut self,
        request: ResizeRequest,
        current_swap_total_mb: u64,
        sink: &mut dyn StatusSink,
    ) -> Result<ResizeOutcome> {
        self.enter(ResizePhase::Validating);
        let target = match self.validate(request, current_swap_total_mb, sink) {
            Ok(target) => target,
            Err(e) => {
                sink.error(&format!("{}\nOperation aborted.", e));
                return Err(e);
            }
        };

        self.enter(ResizePhase::CheckingPrivilegeTool);
        sink.info("Applying new swap space requires root access.");
        let helper = match self.host.find_program(&self.config.privilege_helper) {
            Some(path) => path.to_string_lossy().into_owned(),
            None => {
                sink.error("Root access is not possible.\nOperation aborted.");
                return Err(ResizeError::PrivilegeUnavailable(
                    self.config.privilege_helper.clone(),
                ));
            }
        };

        sink.info(&format!(
            "Starting to change the size of swap file to {} MB.",
            target
        ));

        if target == 0 {
            self.disable(&helper, sink)
        } else {
            self.rebuild(&helper, target, sink)
        }
    }

    fn validate(
        &self,
        request: ResizeRequest,
        current_swap_total_mb: u64,
        sink: &mut dyn StatusSink,
    ) -> Result<u64> {
        let target = validate_target(
            request.target_size_mb,
            current_swap_total_mb,
            self.config.max_size_mb,
        )?;
        if target == 0 {
            return Ok(target);
        }

        let path = &self.config.swapfile_path;
        match self.host.free_space_mb(path) {
            Some(free) => {
                // The old file is overwritten in place, so its blocks count as available
                let available = free.saturating_add(self.host.file_size_mb(path));
                if target > available {
                    return Err(ResizeError::InvalidInput(format!(
                        "not enough free space for {} MB at {} ({} MB available)",
                        target,
                        path.display(),
                        available
                    )));
                }
            }
            None => sink.warn(&format!(
                "Cannot determine free space for {}, skipping the space check.",
                path.display()
            )),
        }

        Ok(target)
    }

    fn disable(&mut self, helper: &str, sink: &mut dyn StatusSink) -> Result<ResizeOutcome> {
        self.enter(ResizePhase::Disabling);
        sink.info("Disabling swap file.");

        let command = ResizeStep::Disable
            .command(&self.config.swapfile_path, 0)
            .elevated(helper);
        let outcome = self.execute(&command, sink)?;

        if !outcome.success() {
            sink.error(&failure_report("Error in operation", &outcome));
            return Err(ResizeError::CommandFailed {
                operation: ResizeOperation::Disable,
                exit_code: outcome.exit_code,
                stderr: outcome.stderr.trim().to_string(),
                state: self.refresh(sink),
            });
        }

        if !outcome.message().is_empty() {
            sink.info(outcome.message());
        }
        sink.info("Swap space is disabled.");
        info!("Swap file {} disabled", self.config.swapfile_path.display());

        let state = self.refresh(sink);
        Ok(ResizeOutcome::Disabled(state))
    }

    fn rebuild(
        &mut self,
        helper: &str,
        size_mb: u64,
        sink: &mut dyn StatusSink,
    ) -> Result<ResizeOutcome> {
        let path = self.config.swapfile_path.clone();
        let plan = RebuildPlan {
            strict_disable: self.host.is_active_swap(&path),
            path,
            size_mb,
        };
        for step in plan.steps() {
            debug!("Rebuild step: {}", step);
        }

        self.enter(ResizePhase::Disabling);
        let command = plan.to_command(helper);
        let outcome = self.execute(&command, sink)?;

        if !outcome.success() {
            sink.error(&failure_report("Failed to update swap space", &outcome));
            // The script may have stopped after swapoff or a truncating dd
            return Err(ResizeError::CommandFailed {
                operation: ResizeOperation::Rebuild,
                exit_code: outcome.exit_code,
                stderr: outcome.stderr.trim().to_string(),
                state: self.refresh(sink),
            });
        }

        for step in ResizeStep::REBUILD.iter().skip(1) {
            if step.phase() != self.phase {
                self.enter(step.phase());
            }
        }
        if !outcome.message().is_empty() {
            sink.info(outcome.message());
        }
        info!(
            "Swap file {} rebuilt with {} MB",
            plan.path.display(),
            size_mb
        );

        let state = self.refresh(sink);
        sink.info("Swap space change operation complete.");
        Ok(ResizeOutcome::Resized(state))
    }

    fn execute(
        &mut self,
        command: &CommandSpec,
        sink: &mut dyn StatusSink,
    ) -> Result<CommandOutcome> {
        match self.executor.run(command) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                sink.error(&format!("Error in operation: {}", e));
                Err(e.into())
            }
        }
    }
}
