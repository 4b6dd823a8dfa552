use core::cell::Cell;

use critical_section::Mutex;

/// Latest reading per (device, channel) slot, shared between the acquisition
/// tick and whoever consumes the readings. Every access happens inside a
/// critical section and reads hand back a copy.
pub struct ReadingBuffer<T: Copy, const DEVICES: usize, const CHANNELS: usize> {
    slots: [[Mutex<Cell<T>>; CHANNELS]; DEVICES],
}

impl<T: Copy, const DEVICES: usize, const CHANNELS: usize> ReadingBuffer<T, DEVICES, CHANNELS> {
    pub fn new(initial: T) -> Self {
        Self {
            slots: core::array::from_fn(|_| {
                core::array::from_fn(|_| Mutex::new(Cell::new(initial)))
            }),
        }
    }

    pub fn get(&self, device: usize, channel: usize) -> Option<T> {
        let slot = self.slots.get(device)?.get(channel)?;

        Some(critical_section::with(|cs| slot.borrow(cs).get()))
    }

    /// Returns false if the slot does not exist.
    pub fn store(&self, device: usize, channel: usize, value: T) -> bool {
        self.update(device, channel, |_| value)
    }

    /// Replaces a slot with a value derived from its current contents.
    pub fn update(&self, device: usize, channel: usize, f: impl FnOnce(T) -> T) -> bool {
        let Some(slot) = self.slots.get(device).and_then(|slots| slots.get(channel)) else {
            return false;
        };

        critical_section::with(|cs| {
            let cell = slot.borrow(cs);
            cell.set(f(cell.get()));
        });

        true
    }

    pub fn fill_device(&self, device: usize, value: T) {
        for channel in 0..CHANNELS {
            self.store(device, channel, value);
        }
    }
}
