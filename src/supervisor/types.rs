#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorCommand {
    #[default]
    Start,
    Restart,
    Stop,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    NotRunning,
}

/// What the launch loop does after a child exits.
#[derive(Debug, PartialEq, Eq)]
pub enum ChildExit {
    Relaunch,
    Terminate { exit_code: i32 },
}
