// Confirmation workflow - Two-step guard in front of destructive actions
use crate::domain::snapshot::ConfirmationState;

#[derive(Debug, Default)]
pub struct Confirmation {
    state: ConfirmationState,
    settling: bool,
}

impl Confirmation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConfirmationState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConfirmationState::Open
    }

    /// Returns false when already open.
    pub fn open(&mut self) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = ConfirmationState::Open;
        true
    }

    /// Close without acting. Ignored while a confirmed action settles.
    pub fn cancel(&mut self) -> bool {
        if !self.is_open() || self.settling {
            return false;
        }
        self.state = ConfirmationState::Closed;
        true
    }

    /// Accept the pending action. Returns false if nothing is open or the
    /// action was already confirmed; the caller must later call [`settle`].
    ///
    /// [`settle`]: Confirmation::settle
    pub fn confirm(&mut self) -> bool {
        if !self.is_open() || self.settling {
            return false;
        }
        self.settling = true;
        true
    }

    /// The confirmed action finished, successfully or not.
    pub fn settle(&mut self) {
        self.settling = false;
        self.state = ConfirmationState::Closed;
    }
}
