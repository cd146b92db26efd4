//! VMware Fusion driver.

use std::borrow::Cow;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fusion_driver_shared::errors::{FusionError, FusionResult};

use super::Driver;
use crate::constants::{bundle, vdisk, vmrun};
use crate::logging::{ExecLog, TracingExecLog};
use crate::util::{CommandRunner, Invocation, ProcessOutput, SystemRunner, absolute_path};

/// Drives VMware Fusion through the tools shipped inside its app bundle.
///
/// Tool paths are derived from `app_path` on every call:
/// `<app_path>/Contents/Library/{vmrun,vmware-vdiskmanager}`.
#[derive(Clone)]
pub struct FusionDriver {
    app_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    exec_log: Arc<dyn ExecLog>,
}

impl fmt::Debug for FusionDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FusionDriver")
            .field("app_path", &self.app_path)
            .finish()
    }
}

impl FusionDriver {
    /// Create a driver for the bundle at `app_path` that runs tools on the
    /// host and logs through `tracing`.
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            runner: Arc::new(SystemRunner),
            exec_log: Arc::new(TracingExecLog),
        }
    }

    /// Replace the process runner.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the execution log.
    pub fn with_exec_log(mut self, exec_log: Arc<dyn ExecLog>) -> Self {
        self.exec_log = exec_log;
        self
    }

    pub fn app_path(&self) -> &Path {
        &self.app_path
    }

    pub fn vmrun_path(&self) -> PathBuf {
        self.tool_path(bundle::VMRUN)
    }

    pub fn vdisk_manager_path(&self) -> PathBuf {
        self.tool_path(bundle::VDISK_MANAGER)
    }

    fn tool_path(&self, name: &str) -> PathBuf {
        let mut path = self.app_path.clone();
        path.extend(bundle::LIBRARY_DIR);
        path.push(name);
        path
    }

    fn vmrun(&self) -> Invocation {
        Invocation::new(self.vmrun_path()).args(vmrun::HOST_TYPE)
    }

    /// Run `invocation`, reporting it to the execution log, and turn a
    /// non-zero exit into a process error.
    fn run_and_log(&self, invocation: Invocation) -> FusionResult<ProcessOutput> {
        self.exec_log.executing(&invocation);

        let result = self.runner.run(&invocation);
        match &result {
            Ok(output) => self
                .exec_log
                .finished(output.stdout_lossy().trim(), output.stderr_lossy().trim()),
            Err(_) => self.exec_log.finished("", ""),
        }

        let output = result?;
        if !output.success() {
            tracing::debug!(
                command = %invocation,
                status = ?output.status,
                "Vendor tool failed"
            );
            return Err(FusionError::Process {
                command: invocation.to_string(),
                reason: exit_reason(output.status),
                status: output.status,
                stderr: output.stderr_lossy().into_owned(),
            });
        }

        Ok(output)
    }
}

impl Driver for FusionDriver {
    fn create_disk(&self, output: &Path, size: &str) -> FusionResult<()> {
        let invocation = Invocation::new(self.vdisk_manager_path())
            .args(["-c", "-s", size, "-a", vdisk::ADAPTER, "-t", vdisk::DISK_TYPE])
            .arg(output);

        self.run_and_log(invocation)?;
        Ok(())
    }

    fn is_running(&self, vmx_path: &Path) -> FusionResult<bool> {
        let vmx_path = absolute_path(vmx_path)?;
        let wanted = path_bytes(&vmx_path);

        let output = self.run_and_log(self.vmrun().arg(vmrun::LIST))?;

        // Exact byte equality; the vendor prints one absolute path per line.
        Ok(output
            .stdout
            .split(|b| *b == b'\n')
            .any(|line| line == &*wanted))
    }

    fn start(&self, vmx_path: &Path) -> FusionResult<()> {
        let invocation = self
            .vmrun()
            .arg(vmrun::START)
            .arg(vmx_path)
            .arg(vmrun::START_MODE);

        self.run_and_log(invocation)?;
        Ok(())
    }

    fn stop(&self, vmx_path: &Path) -> FusionResult<()> {
        let invocation = self
            .vmrun()
            .arg(vmrun::STOP)
            .arg(vmx_path)
            .arg(vmrun::STOP_MODE);

        self.run_and_log(invocation)?;
        Ok(())
    }

    fn verify(&self) -> FusionResult<()> {
        ensure_exists(&self.app_path, FusionError::ApplicationNotFound)?;

        for name in [bundle::VMRUN, bundle::VDISK_MANAGER] {
            ensure_exists(&self.tool_path(name), |path| FusionError::ComponentNotFound {
                name: name.to_string(),
                path,
            })?;
        }

        tracing::debug!(app_path = %self.app_path.display(), "Fusion installation verified");
        Ok(())
    }
}

fn ensure_exists(path: &Path, missing: impl FnOnce(PathBuf) -> FusionError) -> FusionResult<()> {
    classify_stat(path, std::fs::metadata(path).map(drop), missing)
}

/// Map only "not found" to `missing`; other I/O errors pass through untouched.
fn classify_stat(
    path: &Path,
    stat: std::io::Result<()>,
    missing: impl FnOnce(PathBuf) -> FusionError,
) -> FusionResult<()> {
    match stat {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(missing(path.to_path_buf())),
        Err(e) => Err(FusionError::Io(e)),
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path.to_string_lossy().into_owned().into_bytes())
}

fn exit_reason(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::BufferedExecLog;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    const APP: &str = "/Applications/VMware Fusion.app";

    /// Replays canned outputs and records every invocation.
    struct ScriptedRunner {
        calls: Mutex<Vec<Invocation>>,
        outputs: Mutex<VecDeque<FusionResult<ProcessOutput>>>,
    }

    impl ScriptedRunner {
        fn replying(outputs: Vec<FusionResult<ProcessOutput>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                outputs: Mutex::new(outputs.into()),
            })
        }

        fn ok(stdout: impl Into<Vec<u8>>) -> FusionResult<ProcessOutput> {
            Ok(ProcessOutput {
                stdout: stdout.into(),
                stderr: Vec::new(),
                status: Some(0),
            })
        }

        fn failed(code: i32, stderr: &str) -> FusionResult<ProcessOutput> {
            Ok(ProcessOutput {
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
                status: Some(code),
            })
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> FusionResult<ProcessOutput> {
            self.calls.lock().push(invocation.clone());
            self.outputs
                .lock()
                .pop_front()
                .unwrap_or_else(|| Self::ok(""))
        }
    }

    fn driver(runner: &Arc<ScriptedRunner>) -> FusionDriver {
        FusionDriver::new(APP).with_runner(runner.clone())
    }

    #[test]
    fn test_tool_paths() {
        let driver = FusionDriver::new(APP);
        assert_eq!(
            driver.vmrun_path(),
            PathBuf::from("/Applications/VMware Fusion.app/Contents/Library/vmrun")
        );
        assert_eq!(
            driver.vdisk_manager_path(),
            PathBuf::from("/Applications/VMware Fusion.app/Contents/Library/vmware-vdiskmanager")
        );
    }

    #[test]
    fn test_create_disk_argument_order() {
        let runner = ScriptedRunner::replying(vec![]);
        driver(&runner)
            .create_disk(Path::new("/tmp/disk.vmdk"), "40000MB")
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].program,
            PathBuf::from("/Applications/VMware Fusion.app/Contents/Library/vmware-vdiskmanager")
        );
        assert_eq!(
            calls[0].args_lossy(),
            vec!["-c", "-s", "40000MB", "-a", "lsilogic", "-t", "1", "/tmp/disk.vmdk"]
        );
    }

    #[test]
    fn test_create_disk_failure_carries_stderr() {
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::failed(
            1,
            "Failed to create disk: file exists\n",
        )]);
        let err = driver(&runner)
            .create_disk(Path::new("/tmp/disk.vmdk"), "40000MB")
            .unwrap_err();

        assert_eq!(err.stderr(), Some("Failed to create disk: file exists\n"));
        assert_eq!(err.exit_code(), Some(1));
        assert!(err.to_string().contains("Failed to create disk: file exists"));
    }

    #[test]
    fn test_is_running_exact_match() {
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::ok(
            "Total running VMs: 2\n/path/to/vm.vmx\n/other/vm.vmx\n",
        )]);
        assert!(
            driver(&runner)
                .is_running(Path::new("/path/to/vm.vmx"))
                .unwrap()
        );

        let calls = runner.calls();
        assert_eq!(calls[0].args_lossy(), vec!["-T", "fusion", "list"]);
        assert_eq!(
            calls[0].program,
            PathBuf::from("/Applications/VMware Fusion.app/Contents/Library/vmrun")
        );
    }

    #[test]
    fn test_is_running_not_listed() {
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::ok("/other/vm.vmx\n")]);
        assert!(
            !driver(&runner)
                .is_running(Path::new("/path/to/vm.vmx"))
                .unwrap()
        );
    }

    #[test]
    fn test_is_running_no_trimming() {
        let runner = ScriptedRunner::replying(vec![
            ScriptedRunner::ok("/path/to/vm.vmx \n"),
            ScriptedRunner::ok("/path/to/vm.vmx\r\n"),
            ScriptedRunner::ok("/PATH/TO/VM.VMX\n"),
        ]);
        let driver = driver(&runner);

        for _ in 0..3 {
            assert!(!driver.is_running(Path::new("/path/to/vm.vmx")).unwrap());
        }
    }

    #[test]
    fn test_is_running_relative_listing_does_not_match() {
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::ok("vm.vmx\n")]);
        assert!(!driver(&runner).is_running(Path::new("vm.vmx")).unwrap());
    }

    #[test]
    fn test_is_running_resolves_query_path() {
        let cwd = std::env::current_dir().unwrap();
        let listed = cwd.join("vm.vmx");
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::ok(format!(
            "{}\n",
            listed.display()
        ))]);

        assert!(
            driver(&runner)
                .is_running(Path::new("./sub/../vm.vmx"))
                .unwrap()
        );
    }

    #[test]
    fn test_is_running_list_failure() {
        let runner =
            ScriptedRunner::replying(vec![ScriptedRunner::failed(255, "Error: not licensed")]);
        let err = driver(&runner)
            .is_running(Path::new("/path/to/vm.vmx"))
            .unwrap_err();

        assert!(matches!(err, FusionError::Process { .. }));
        assert_eq!(err.stderr(), Some("Error: not licensed"));
    }

    #[test]
    fn test_start_always_gui() {
        let runner = ScriptedRunner::replying(vec![]);
        driver(&runner).start(Path::new("/path/to/vm.vmx")).unwrap();

        assert_eq!(
            runner.calls()[0].args_lossy(),
            vec!["-T", "fusion", "start", "/path/to/vm.vmx", "gui"]
        );
    }

    #[test]
    fn test_stop_always_hard() {
        let runner = ScriptedRunner::replying(vec![]);
        driver(&runner).stop(Path::new("vm.vmx")).unwrap();

        // Start/stop pass the path through as given.
        assert_eq!(
            runner.calls()[0].args_lossy(),
            vec!["-T", "fusion", "stop", "vm.vmx", "hard"]
        );
    }

    #[test]
    fn test_stop_failure() {
        let runner = ScriptedRunner::replying(vec![ScriptedRunner::failed(
            1,
            "Error: The virtual machine is not powered on",
        )]);
        let err = driver(&runner)
            .stop(Path::new("/path/to/vm.vmx"))
            .unwrap_err();

        assert!(
            err.to_string()
                .ends_with("exit status 1: Error: The virtual machine is not powered on")
        );
    }

    #[test]
    fn test_launch_failure_propagates() {
        let runner = ScriptedRunner::replying(vec![Err(FusionError::Process {
            command: "vmrun".into(),
            reason: "No such file or directory (os error 2)".into(),
            status: None,
            stderr: String::new(),
        })]);
        let err = driver(&runner)
            .start(Path::new("/path/to/vm.vmx"))
            .unwrap_err();

        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_exec_log_records_each_invocation() {
        let runner = ScriptedRunner::replying(vec![Ok(ProcessOutput {
            stdout: b"  /path/to/vm.vmx\n".to_vec(),
            stderr: b"warning\n".to_vec(),
            status: Some(0),
        })]);
        let log = Arc::new(BufferedExecLog::new());
        let driver = driver(&runner).with_exec_log(log.clone());

        driver.is_running(Path::new("/path/to/vm.vmx")).unwrap();

        assert_eq!(
            log.lines(),
            vec![
                format!(
                    "Executing: {}/Contents/Library/vmrun [-T fusion list]",
                    APP
                ),
                "stdout: /path/to/vm.vmx".to_string(),
                "stderr: warning".to_string(),
            ]
        );
    }

    #[test]
    fn test_exec_log_on_launch_failure() {
        let runner = ScriptedRunner::replying(vec![Err(FusionError::Process {
            command: "vmrun".into(),
            reason: "permission denied".into(),
            status: None,
            stderr: String::new(),
        })]);
        let log = Arc::new(BufferedExecLog::new());
        let driver = driver(&runner).with_exec_log(log.clone());

        assert!(driver.stop(Path::new("/path/to/vm.vmx")).is_err());
        assert_eq!(log.lines()[1..], ["stdout: ", "stderr: "]);
    }

    #[cfg(unix)]
    #[test]
    fn test_is_running_compares_raw_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // Both invalid sequences decode to U+FFFD; only the exact bytes match.
        let listed = b"/vms/\xff.vmx\n".to_vec();
        let runner = ScriptedRunner::replying(vec![
            ScriptedRunner::ok(listed.clone()),
            ScriptedRunner::ok(listed),
        ]);
        let driver = driver(&runner);

        let other = Path::new(OsStr::from_bytes(b"/vms/\xfe.vmx"));
        assert!(!driver.is_running(other).unwrap());

        let same = Path::new(OsStr::from_bytes(b"/vms/\xff.vmx"));
        assert!(driver.is_running(same).unwrap());
    }

    #[test]
    fn test_permission_denied_is_not_reclassified() {
        let stat = Err(std::io::Error::from(ErrorKind::PermissionDenied));
        let err = classify_stat(Path::new(APP), stat, FusionError::ApplicationNotFound)
            .unwrap_err();

        match err {
            FusionError::Io(e) => assert_eq!(e.kind(), ErrorKind::PermissionDenied),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_is_classified() {
        let stat = Err(std::io::Error::from(ErrorKind::NotFound));
        let err = classify_stat(Path::new(APP), stat, FusionError::ApplicationNotFound)
            .unwrap_err();

        assert!(matches!(err, FusionError::ApplicationNotFound(p) if p == Path::new(APP)));
    }

    #[test]
    fn test_ensure_exists_passes_other_errors_through() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"").unwrap();

        // A path below a regular file is ENOTDIR, not ENOENT.
        let err = ensure_exists(&file.join("child"), FusionError::ApplicationNotFound).unwrap_err();
        assert!(matches!(err, FusionError::Io(_)));
    }
}
