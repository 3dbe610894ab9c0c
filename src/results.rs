use std::num::NonZeroUsize;

use parking_lot::Mutex;

use crate::error::{Result, WorkerErr};

/// One timing slot per worker, shared by every worker of a run.
///
/// A single lock covers the whole buffer. Each worker writes its own slot at
/// most once, unwritten slots read as `0.0`.
#[derive(Debug)]
pub struct Results {
    slots: Mutex<Vec<Option<f32>>>,
}

impl Results {
    /// Creates a new `Results` with exactly `size` unwritten slots.
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(vec![None; size.get()]),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.lock().len()
    }

    /// Records the timing of the worker with the 1-based `worker_id`.
    ///
    /// # Errors
    /// `WorkerErr::UnknownSlot` if `worker_id` is zero or greater than the
    /// amount of slots, `WorkerErr::AlreadyRecorded` if the slot was written
    /// before.
    pub fn set(&self, worker_id: usize, value: f32) -> Result<()> {
        let mut slots = self.slots.lock();
        let size = slots.len();
        let slot = worker_id
            .checked_sub(1)
            .and_then(|idx| slots.get_mut(idx))
            .ok_or(WorkerErr::UnknownSlot { worker_id, size })?;

        if slot.is_some() {
            return Err(WorkerErr::AlreadyRecorded { worker_id });
        }

        *slot = Some(value);
        Ok(())
    }

    /// The recorded value of `worker_id`, if any.
    pub fn get(&self, worker_id: usize) -> Option<f32> {
        self.slots.lock().get(worker_id.checked_sub(1)?).copied().flatten()
    }

    /// The sum of every slot, unwritten slots counting as zero.
    pub fn sum(&self) -> f64 {
        self.slots.lock().iter().flatten().map(|&v| v as f64).sum()
    }

    /// The sum divided by the amount of slots, written or not.
    pub fn average(&self) -> f64 {
        let slots = self.slots.lock();
        let sum: f64 = slots.iter().flatten().map(|&v| v as f64).sum();
        sum / slots.len() as f64
    }

    /// The amount of slots that were written.
    pub fn recorded(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn results(size: usize) -> Results {
        Results::new(NonZeroUsize::new(size).unwrap())
    }

    #[test]
    fn starts_with_unset_slots() {
        let results = results(4);

        assert_eq!(results.size(), 4);
        assert_eq!(results.recorded(), 0);
        assert_eq!(results.sum(), 0.0);
        assert_eq!(results.get(1), None);
    }

    #[test]
    fn average_of_equal_values_is_the_value() {
        let results = results(5);
        for id in 1..=5 {
            results.set(id, 7.5).unwrap();
        }

        assert_eq!(results.average(), 7.5);
        assert_eq!(results.recorded(), 5);
    }

    #[test]
    fn average_divides_by_every_slot() {
        let results = results(4);
        results.set(1, 10.0).unwrap();
        results.set(3, 30.0).unwrap();

        assert_eq!(results.sum(), 40.0);
        assert_eq!(results.average(), 40.0 / 4.0);
        assert_eq!(results.recorded(), 2);
    }

    #[test]
    fn slots_are_written_once() {
        let results = results(2);
        results.set(2, 1.0).unwrap();

        assert!(matches!(
            results.set(2, 2.0),
            Err(WorkerErr::AlreadyRecorded { worker_id: 2 })
        ));
        assert_eq!(results.get(2), Some(1.0));
    }

    #[test]
    fn set_out_of_range_is_rejected() {
        let results = results(2);

        assert!(matches!(
            results.set(0, 1.0),
            Err(WorkerErr::UnknownSlot { worker_id: 0, size: 2 })
        ));
        assert!(matches!(
            results.set(3, 1.0),
            Err(WorkerErr::UnknownSlot { worker_id: 3, size: 2 })
        ));
        assert_eq!(results.recorded(), 0);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let results = results(2);

        assert_eq!(results.get(0), None);
        assert_eq!(results.get(3), None);
    }

    #[test]
    fn concurrent_writers_fill_their_own_slot() {
        const WORKERS: usize = 32;

        let results = Arc::new(results(WORKERS));
        let handles: Vec<_> = (1..=WORKERS)
            .map(|id| {
                let results = Arc::clone(&results);
                thread::spawn(move || results.set(id, id as f32))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(results.recorded(), WORKERS);
        for id in 1..=WORKERS {
            assert_eq!(results.get(id), Some(id as f32));
        }
    }
}
