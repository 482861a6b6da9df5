use std::collections::VecDeque;

use proven_beacon_client::{Error, Result};

/// A queue of scripted responses in front of a sticky current value.
///
/// Queued successes become the sticky value once served; queued errors are
/// served exactly once.
#[derive(Debug)]
pub struct Script<T> {
    queue: VecDeque<Result<T>>,
    current: Option<T>,
    calls: usize,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            calls: 0,
        }
    }
}

impl<T: Clone> Script<T> {
    pub fn set(&mut self, value: T) {
        self.current = Some(value);
    }

    pub fn push(&mut self, response: Result<T>) {
        self.queue.push_back(response);
    }

    pub const fn calls(&self) -> usize {
        self.calls
    }

    pub fn next(&mut self, what: &str) -> Result<T> {
        self.calls += 1;
        match self.queue.pop_front() {
            Some(Ok(value)) => {
                self.current = Some(value.clone());
                Ok(value)
            }
            Some(Err(e)) => Err(e),
            None => self
                .current
                .clone()
                .ok_or_else(|| Error::not_found(what)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_errors_are_one_shot() {
        let mut script = Script::default();
        script.set(1);
        script.push(Err(Error::request("boom")));
        script.push(Ok(2));

        assert!(script.next("value").is_err());
        assert_eq!(script.next("value").unwrap(), 2);
        assert_eq!(script.next("value").unwrap(), 2);
        assert_eq!(script.calls(), 3);
    }

    #[test]
    fn test_script_without_value_is_not_found() {
        let mut script: Script<u8> = Script::default();
        assert!(matches!(script.next("head"), Err(Error::NotFound(_))));
    }
}
