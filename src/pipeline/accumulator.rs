use std::sync::Mutex;

/// An append-only collection shared between workers.
///
/// Each accumulator owns its own lock; the critical section is only the append.
#[derive(Debug)]
pub struct Accumulator<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Accumulator<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, item: T) {
        self.items.lock().expect("accumulator mutex poisoned").push(item);
    }

    /// Append all of `items` under a single lock acquisition.
    pub fn extend(&self, items: Vec<T>) {
        self.items.lock().expect("accumulator mutex poisoned").extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("accumulator mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the collected items once all workers are done.
    pub fn into_inner(self) -> Vec<T> {
        self.items.into_inner().expect("accumulator mutex poisoned")
    }
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Accumulator;
    use std::thread;

    #[test]
    fn concurrent_appends_are_all_kept() {
        let acc = Accumulator::new();
        thread::scope(|s| {
            for t in 0..8 {
                let acc = &acc;
                s.spawn(move || {
                    for i in 0..50 {
                        acc.push(t * 1000 + i);
                    }
                    acc.extend(vec![-1, -2]);
                });
            }
        });

        assert_eq!(acc.len(), 8 * 52);
        let mut items = acc.into_inner();
        items.retain(|v| *v >= 0);
        items.sort();
        items.dedup();
        assert_eq!(items.len(), 400);
    }
}
