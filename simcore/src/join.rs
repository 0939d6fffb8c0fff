use crate::{Resume, Scheduler, SimError};

/// Fork-join barrier: resumes the parent once all of its `count` children have arrived.
///
/// The parent stores the join in the [`State`](crate::State) and hands the key to each child.
/// A child calls [`Join::arrive`] when it terminates.
#[derive(Debug)]
pub struct Join {
    remaining: usize,
    resume: Option<Resume<()>>,
}

impl Join {
    /// Creates a join waiting for `count` children. `count` must be positive.
    #[must_use]
    pub fn new(count: usize, resume: Resume<()>) -> Self {
        Self {
            remaining: count,
            resume: Some(resume),
        }
    }

    /// Registers the termination of one child. Returns `true` if it was the last one, in which
    /// case the parent has been resumed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CapacityExceeded`] if more children arrive than were declared.
    pub fn arrive(&mut self, scheduler: &mut Scheduler) -> Result<bool, SimError> {
        if self.remaining == 0 {
            return Err(SimError::CapacityExceeded(String::from(
                "more children arrived at a join than it was created for",
            )));
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            if let Some(resume) = self.resume.take() {
                resume.resume((), scheduler);
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Number of children that have not arrived yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}
