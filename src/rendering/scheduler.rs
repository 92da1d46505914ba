#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
}

/// Frame loop state. The tick counter is the only thing that survives
/// between pacing signals; its parity picks the buffer roles.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    state: SchedulerState,
    tick: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle to running. Starting twice keeps the current tick.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            log::info!("Frame scheduler running");
            self.state = SchedulerState::Running;
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Tick about to run (`t`).
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn parity(&self) -> usize {
        (self.tick % 2) as usize
    }

    /// Called once per submitted frame, never otherwise.
    pub(crate) fn advance(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }
}
