use std::collections::VecDeque;

use crate::{Resume, Scheduler, SimError};

/// Relative tolerance for float rounding when putting into an almost full container.
const TOLERANCE: f64 = 1e-9;

/// Continuous quantity between zero and a fixed capacity, e.g., a fuel tank.
///
/// Gets wait until the requested amount is available and are served in FIFO order: a waiting get
/// that cannot be satisfied blocks the ones behind it.
#[derive(Debug)]
pub struct Container {
    level: f64,
    capacity: f64,
    waiting: VecDeque<(f64, Resume<f64>)>,
}

fn check_amount(amount: f64) -> Result<f64, SimError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(SimError::InvalidAmount(amount))
    }
}

impl Container {
    /// Creates a container with the given capacity and initial level.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAmount`] for a negative or non-finite capacity or level,
    /// and [`SimError::CapacityExceeded`] if `level` is above `capacity`.
    pub fn new(capacity: f64, level: f64) -> Result<Self, SimError> {
        let capacity = check_amount(capacity)?;
        let level = check_amount(level)?;
        if level > capacity {
            return Err(SimError::CapacityExceeded(format!(
                "initial level {} above capacity {}",
                level, capacity
            )));
        }
        Ok(Self {
            level,
            capacity,
            waiting: VecDeque::new(),
        })
    }

    /// Creates a full container.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAmount`] for a negative or non-finite capacity.
    pub fn full(capacity: f64) -> Result<Self, SimError> {
        Self::new(capacity, capacity)
    }

    /// Takes `amount` out of the container. `resume` fires with the amount once it has been
    /// subtracted.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAmount`] for a negative or non-finite amount.
    pub fn get(
        &mut self,
        amount: f64,
        resume: Resume<f64>,
        scheduler: &mut Scheduler,
    ) -> Result<(), SimError> {
        let amount = check_amount(amount)?;
        self.waiting.push_back((amount, resume));
        self.serve(scheduler);
        Ok(())
    }

    /// Adds `amount` to the container and serves waiting gets that became satisfiable.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidAmount`] for a negative or non-finite amount, and
    /// [`SimError::CapacityExceeded`] if the amount does not fit. Overshooting by float rounding
    /// only is clamped to the capacity.
    pub fn put(&mut self, amount: f64, scheduler: &mut Scheduler) -> Result<(), SimError> {
        let amount = check_amount(amount)?;
        let level = self.level + amount;
        if level > self.capacity + TOLERANCE * self.capacity.max(1.0) {
            return Err(SimError::CapacityExceeded(format!(
                "cannot put {} into a container at {} of {}",
                amount, self.level, self.capacity
            )));
        }
        self.level = level.min(self.capacity);
        self.serve(scheduler);
        Ok(())
    }

    /// Tops the container up to exactly its capacity and serves any waiting gets.
    pub fn fill(&mut self, scheduler: &mut Scheduler) {
        self.level = self.capacity;
        self.serve(scheduler);
    }

    fn serve(&mut self, scheduler: &mut Scheduler) {
        while let Some((amount, _)) = self.waiting.front() {
            if *amount > self.level {
                break;
            }
            if let Some((amount, resume)) = self.waiting.pop_front() {
                self.level = (self.level - amount).max(0.0);
                resume.resume(amount, scheduler);
            }
        }
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> f64 {
        self.level
    }

    /// Maximum level.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Amount that can still be put.
    #[must_use]
    pub fn free(&self) -> f64 {
        self.capacity - self.level
    }

    /// Answers whether the level has reached the capacity.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_full(&self) -> bool {
        self.level == self.capacity
    }

    /// Number of gets waiting for the level to rise.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn collect(into: &Rc<RefCell<Vec<f64>>>) -> Resume<f64> {
        let into = Rc::clone(into);
        Resume::from_fn(move |amount, _: &mut Scheduler| into.borrow_mut().push(amount))
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            Container::new(10.0, 11.0),
            Err(SimError::CapacityExceeded(_))
        ));
        assert_eq!(
            Container::new(-1.0, 0.0).err(),
            Some(SimError::InvalidAmount(-1.0))
        );
    }

    #[test]
    fn test_get_waits_for_put() {
        let mut scheduler = Scheduler::default();
        let got = Rc::new(RefCell::new(Vec::new()));
        let mut tank = Container::new(100.0, 30.0).unwrap();
        tank.get(20.0, collect(&got), &mut scheduler).unwrap();
        tank.get(50.0, collect(&got), &mut scheduler).unwrap();
        tank.get(5.0, collect(&got), &mut scheduler).unwrap();
        assert_eq!(*got.borrow(), vec![20.0]);
        assert_eq!(tank.level(), 10.0);
        assert_eq!(tank.queue_len(), 2);

        tank.put(45.0, &mut scheduler).unwrap();
        assert_eq!(*got.borrow(), vec![20.0, 50.0, 5.0]);
        assert_eq!(tank.level(), 0.0);
        assert_eq!(tank.queue_len(), 0);
    }

    #[test]
    fn test_zero_get_is_immediate() {
        let mut scheduler = Scheduler::default();
        let got = Rc::new(RefCell::new(Vec::new()));
        let mut tank = Container::new(100.0, 0.0).unwrap();
        tank.get(0.0, collect(&got), &mut scheduler).unwrap();
        assert_eq!(*got.borrow(), vec![0.0]);
    }

    #[test]
    fn test_put_over_capacity() {
        let mut scheduler = Scheduler::default();
        let mut tank = Container::new(100.0, 60.0).unwrap();
        assert!(matches!(
            tank.put(41.0, &mut scheduler),
            Err(SimError::CapacityExceeded(_))
        ));
        assert_eq!(tank.level(), 60.0);
        assert_eq!(
            tank.put(-1.0, &mut scheduler),
            Err(SimError::InvalidAmount(-1.0))
        );
        tank.put(40.0 + 1e-12, &mut scheduler).unwrap();
        assert!(tank.is_full());
        assert_eq!(tank.free(), 0.0);
    }

    #[test]
    fn test_fill_reaches_capacity_from_fractional_level() {
        let mut scheduler = Scheduler::default();
        let got = Rc::new(RefCell::new(Vec::new()));
        let mut tank = Container::new(100_000.0, 100_000.0).unwrap();
        for amount in &[0.1, 0.2, 33_333.3, 1e-7] {
            tank.get(*amount, collect(&got), &mut scheduler).unwrap();
        }
        tank.fill(&mut scheduler);
        assert!(tank.is_full());
        assert_eq!(tank.level(), tank.capacity());
        assert_eq!(tank.free(), 0.0);

        tank.get(150_000.0, collect(&got), &mut scheduler).unwrap();
        tank.get(60_000.0, collect(&got), &mut scheduler).unwrap();
        tank.fill(&mut scheduler);
        assert_eq!(got.borrow().len(), 4);
        assert_eq!(tank.queue_len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Get(f64),
        Put(f64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0.0..150.0_f64).prop_map(Op::Get),
            (0.0..150.0_f64).prop_map(Op::Put),
        ]
    }

    proptest! {
        #[test]
        fn test_conservation(
            initial in 0.0..100.0_f64,
            ops in proptest::collection::vec(op(), 0..40),
        ) {
            let mut scheduler = Scheduler::default();
            let got = Rc::new(RefCell::new(Vec::new()));
            let mut tank = Container::new(100.0, initial).unwrap();
            let mut put_total = 0.0;
            for op in ops {
                match op {
                    Op::Get(amount) => tank.get(amount, collect(&got), &mut scheduler).unwrap(),
                    Op::Put(amount) => {
                        if tank.put(amount, &mut scheduler).is_ok() {
                            put_total += amount;
                        }
                    }
                }
                prop_assert!(tank.level() >= 0.0);
                prop_assert!(tank.level() <= tank.capacity());
            }
            let got_total: f64 = got.borrow().iter().sum();
            prop_assert!(approx_eq!(
                f64,
                got_total,
                put_total + initial - tank.level(),
                epsilon = 1e-6
            ));
        }
    }
}
