//! Loop bookkeeping for `break` and `continue`.
//!
//! `break` always jumps forward past the loop, so its jumps are collected and
//! patched on exit. `continue` jumps backward in `while` loops, but forward in
//! `do`/`while` and `for` loops where the target (the condition or the update
//! clause) comes after the body; those jumps wait until the target is set.

use super::JumpLabel;

/// Stack of enclosing loops, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    loops: Vec<LoopContext>,
}

#[derive(Debug, Default)]
struct LoopContext {
    /// Known once the compiler has emitted the continue target.
    continue_target: Option<usize>,
    pending_continues: Vec<JumpLabel>,
    break_labels: Vec<JumpLabel>,
}

/// Where a `continue` in the current loop should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueTarget {
    /// Jump back to this offset.
    Backward(usize),
    /// Target not emitted yet: jump forward and patch later.
    Forward,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a loop whose continue target may not be known yet.
    pub fn enter_loop(&mut self, continue_target: Option<usize>) {
        self.loops.push(LoopContext {
            continue_target,
            ..LoopContext::default()
        });
    }

    /// Exit the current loop, returning the break jumps to patch.
    pub fn exit_loop(&mut self) -> Vec<JumpLabel> {
        self.loops
            .pop()
            .map(|ctx| ctx.break_labels)
            .unwrap_or_default()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }

    pub fn add_break(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.break_labels.push(label);
        }
    }

    pub fn add_continue(&mut self, label: JumpLabel) {
        if let Some(ctx) = self.loops.last_mut() {
            ctx.pending_continues.push(label);
        }
    }

    pub fn continue_target(&self) -> Option<ContinueTarget> {
        self.loops.last().map(|ctx| match ctx.continue_target {
            Some(offset) => ContinueTarget::Backward(offset),
            None => ContinueTarget::Forward,
        })
    }

    /// Fix the continue target of the current loop, returning the forward
    /// jumps that were waiting for it.
    pub fn set_continue_target(&mut self, target: usize) -> Vec<JumpLabel> {
        match self.loops.last_mut() {
            Some(ctx) => {
                ctx.continue_target = Some(target);
                std::mem::take(&mut ctx.pending_continues)
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_manager_not_in_loop() {
        let manager = JumpManager::new();
        assert!(!manager.in_loop());
        assert_eq!(manager.continue_target(), None);
    }

    #[test]
    fn nested_loops() {
        let mut manager = JumpManager::new();
        manager.enter_loop(Some(10));
        manager.enter_loop(Some(20));

        assert_eq!(manager.loop_depth(), 2);
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Backward(20)));

        manager.exit_loop();
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Backward(10)));
    }

    #[test]
    fn exit_loop_returns_breaks() {
        let mut manager = JumpManager::new();
        manager.enter_loop(Some(10));
        manager.add_break(JumpLabel(100));
        manager.add_break(JumpLabel(110));

        let breaks = manager.exit_loop();
        assert_eq!(breaks, vec![JumpLabel(100), JumpLabel(110)]);
        assert!(manager.exit_loop().is_empty());
    }

    #[test]
    fn forward_continues_wait_for_target() {
        let mut manager = JumpManager::new();
        manager.enter_loop(None);
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Forward));
        manager.add_continue(JumpLabel(7));

        let pending = manager.set_continue_target(30);
        assert_eq!(pending, vec![JumpLabel(7)]);
        assert_eq!(manager.continue_target(), Some(ContinueTarget::Backward(30)));
        assert!(manager.set_continue_target(30).is_empty());
    }
}
