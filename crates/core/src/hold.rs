//! Hold slot - stashes one piece kind, usable once per spawn

use crate::types::PieceKind;

/// What a hold request resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldExchange {
    /// Hold already used since the last spawn
    Unavailable,
    /// Slot was empty: the active kind is stashed and the next piece must spawn
    Stashed,
    /// Slot was full: spawn this kind in place of the active piece
    Swapped(PieceKind),
}

/// The hold slot and its once-per-spawn flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldSlot {
    kind: Option<PieceKind>,
    available: bool,
}

impl HoldSlot {
    pub fn new() -> Self {
        Self {
            kind: None,
            available: true,
        }
    }

    pub fn kind(&self) -> Option<PieceKind> {
        self.kind
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Put `active` in the slot, returning what the caller must spawn next
    ///
    /// Consumes the flag on success; a consumed flag leaves the slot untouched.
    pub fn exchange(&mut self, active: PieceKind) -> HoldExchange {
        if !self.available {
            return HoldExchange::Unavailable;
        }
        self.available = false;
        match self.kind.replace(active) {
            None => HoldExchange::Stashed,
            Some(previous) => HoldExchange::Swapped(previous),
        }
    }

    /// Re-enable hold after a regular spawn
    pub fn rearm(&mut self) {
        self.available = true;
    }

    /// Empty the slot for a new session
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for HoldSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_hold_stashes() {
        let mut hold = HoldSlot::new();
        assert_eq!(hold.exchange(PieceKind::T), HoldExchange::Stashed);
        assert_eq!(hold.kind(), Some(PieceKind::T));
        assert!(!hold.is_available());
    }

    #[test]
    fn test_second_hold_without_rearm_is_noop() {
        let mut hold = HoldSlot::new();
        hold.exchange(PieceKind::T);
        assert_eq!(hold.exchange(PieceKind::I), HoldExchange::Unavailable);
        assert_eq!(hold.kind(), Some(PieceKind::T));
    }

    #[test]
    fn test_swap_after_rearm() {
        let mut hold = HoldSlot::new();
        hold.exchange(PieceKind::T);
        hold.rearm();
        assert_eq!(hold.exchange(PieceKind::I), HoldExchange::Swapped(PieceKind::T));
        assert_eq!(hold.kind(), Some(PieceKind::I));
    }

    #[test]
    fn test_reset() {
        let mut hold = HoldSlot::new();
        hold.exchange(PieceKind::S);
        hold.reset();
        assert_eq!(hold, HoldSlot::new());
    }
}
