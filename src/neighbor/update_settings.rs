/// When the neighbor list is checked for a rebuild
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateSettings {
    /// Check every this many steps
    pub every: u64,
    /// Minimum number of steps between two builds
    pub delay: u64,
    /// Only rebuild when some particle moved more than half the buffer
    pub check: bool,
}
impl UpdateSettings {
    pub fn new(every: u64, delay: u64, check: bool) -> Self {
        Self {
            every: every.max(1),
            delay,
            check,
        }
    }
    pub fn should_check(&self, step: u64, last_build_step: u64) -> bool {
        step % self.every == 0 && step.saturating_sub(last_build_step) >= self.delay
    }
}
impl Default for UpdateSettings {
    fn default() -> Self {
        Self::new(1, 0, true)
    }
}
