//! Contracts for the systems the colony core talks to but does not own.
//!
//! Energy, the parasite population and the defensive-swarm spawner live
//! outside this crate. They are injected where needed, never reached
//! through globals.

use std::cell::RefCell;
use std::rc::Rc;

use hivefall_types::{HiveId, ParasiteId, Position};

/// The energy economy.
///
/// Credits and debits are the only mutation points; everything else is a
/// query.
pub trait EnergySystem {
    /// Add `amount` energy.
    fn credit_energy(&mut self, amount: f32);

    /// Remove up to `amount` energy. Returns whether the full amount was
    /// available.
    fn consume_energy(&mut self, amount: f32) -> bool;

    /// Current energy total.
    fn total_energy(&self) -> f32;

    /// Low-frequency housekeeping, driven by the throttled scheduler.
    fn update(&mut self, _dt: f32) {}
}

impl<T: EnergySystem + ?Sized> EnergySystem for Box<T> {
    fn credit_energy(&mut self, amount: f32) {
        (**self).credit_energy(amount);
    }

    fn consume_energy(&mut self, amount: f32) -> bool {
        (**self).consume_energy(amount)
    }

    fn total_energy(&self) -> f32 {
        (**self).total_energy()
    }

    fn update(&mut self, dt: f32) {
        (**self).update(dt);
    }
}

/// A single energy pool shared between several owners on one thread.
impl<T: EnergySystem + ?Sized> EnergySystem for Rc<RefCell<T>> {
    fn credit_energy(&mut self, amount: f32) {
        self.borrow_mut().credit_energy(amount);
    }

    fn consume_energy(&mut self, amount: f32) -> bool {
        self.borrow_mut().consume_energy(amount)
    }

    fn total_energy(&self) -> f32 {
        self.borrow().total_energy()
    }

    fn update(&mut self, dt: f32) {
        self.borrow_mut().update(dt);
    }
}

/// The minimal view of a parasite the recovery layer needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParasiteView {
    /// Parasite id.
    pub id: ParasiteId,
    /// Whether the parasite is still alive.
    pub alive: bool,
    /// Current world position.
    pub position: Position,
}

/// The parasite population.
pub trait ParasiteSource {
    /// Every parasite the population currently tracks, dead ones included.
    fn all_parasites(&self) -> Vec<ParasiteView>;
}

impl<T: ParasiteSource + ?Sized> ParasiteSource for Rc<RefCell<T>> {
    fn all_parasites(&self) -> Vec<ParasiteView> {
        self.borrow().all_parasites()
    }
}

/// Spawns the defensive swarm around a freshly completed hive.
pub trait DefenseSpawner {
    /// Spawn up to `count` defenders at `position` and return their ids.
    fn spawn_defenders(&mut self, hive: &HiveId, position: Position, count: u32) -> Vec<ParasiteId>;
}

impl<T: DefenseSpawner + ?Sized> DefenseSpawner for Rc<RefCell<T>> {
    fn spawn_defenders(
        &mut self,
        hive: &HiveId,
        position: Position,
        count: u32,
    ) -> Vec<ParasiteId> {
        self.borrow_mut().spawn_defenders(hive, position, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pool(f32);

    impl EnergySystem for Pool {
        fn credit_energy(&mut self, amount: f32) {
            self.0 += amount;
        }

        fn consume_energy(&mut self, amount: f32) -> bool {
            if self.0 >= amount {
                self.0 -= amount;
                true
            } else {
                false
            }
        }

        fn total_energy(&self) -> f32 {
            self.0
        }
    }

    #[test]
    fn shared_pool_sees_credits_from_every_handle() {
        let pool = Rc::new(RefCell::new(Pool(10.0)));
        let mut a = Rc::clone(&pool);
        let mut b: Box<dyn EnergySystem> = Box::new(Rc::clone(&pool));
        a.credit_energy(5.0);
        b.credit_energy(5.0);
        assert!((pool.borrow().total_energy() - 20.0).abs() < f32::EPSILON);
        assert!(b.consume_energy(15.0));
        assert!(!a.consume_energy(15.0));
    }
}
