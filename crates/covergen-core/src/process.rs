use std::sync::OnceLock;

/// Random token identifying this process in `running` step records. A pid
/// alone is not enough: a restarted service can come back with the pid of
/// the process that crashed.
pub fn owner_token() -> &'static str {
    static TOKEN: OnceLock<String> = OnceLock::new();
    TOKEN.get_or_init(|| uuid::Uuid::new_v4().to_string())
}

/// Whether the owner of a `running` step can still finish it.
pub fn is_owner_alive(pid: u32, token: Option<&str>) -> bool {
    if token == Some(owner_token()) {
        return true;
    }
    // Our pid with someone else's token: an earlier process that had this pid.
    if pid == std::process::id() {
        return false;
    }
    is_pid_alive(pid)
}

/// Whether a process with `pid` is alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .env("LC_ALL", "C")
            .output()
            .map(|o| kill_reports_alive(o.status.success(), &o.stderr))
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        // TODO: Windows support via OpenProcess
        let _ = pid;
        false
    }
}

/// EPERM means the process exists but belongs to another user.
#[cfg(unix)]
fn kill_reports_alive(success: bool, stderr: &[u8]) -> bool {
    success || String::from_utf8_lossy(stderr).contains("Operation not permitted")
}
