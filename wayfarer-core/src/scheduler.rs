//! Mutual exclusion over turns, event generation and director analysis.
//!
//! Each gate is a one-permit semaphore acquired with `try_acquire`. A
//! caller that finds a gate closed is told so; nothing ever waits in line.

use tokio::sync::{Semaphore, SemaphorePermit};

/// Held for the duration of one player turn.
#[derive(Debug)]
pub struct ConsolePermit<'a>(#[allow(dead_code)] SemaphorePermit<'a>);

/// Held while an event, consequence or resolution is being generated.
#[derive(Debug)]
pub struct EventPermit<'a>(#[allow(dead_code)] SemaphorePermit<'a>);

/// Held while the director analyses the story.
#[derive(Debug)]
pub struct DirectorPermit<'a>(#[allow(dead_code)] SemaphorePermit<'a>);

#[derive(Debug)]
pub struct Scheduler {
    console: Semaphore,
    events: Semaphore,
    director: Semaphore,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            console: Semaphore::new(1),
            events: Semaphore::new(1),
            director: Semaphore::new(1),
        }
    }

    pub fn try_console(&self) -> Option<ConsolePermit<'_>> {
        self.console.try_acquire().ok().map(ConsolePermit)
    }

    pub fn try_events(&self) -> Option<EventPermit<'_>> {
        self.events.try_acquire().ok().map(EventPermit)
    }

    pub fn try_director(&self) -> Option<DirectorPermit<'_>> {
        self.director.try_acquire().ok().map(DirectorPermit)
    }

    pub fn console_busy(&self) -> bool {
        self.console.available_permits() == 0
    }

    pub fn events_busy(&self) -> bool {
        self.events.available_permits() == 0
    }

    pub fn director_busy(&self) -> bool {
        self.director.available_permits() == 0
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_is_exclusive() {
        let scheduler = Scheduler::new();
        let permit = scheduler.try_console();
        assert!(permit.is_some());
        assert!(scheduler.console_busy());
        assert!(scheduler.try_console().is_none());
        drop(permit);
        assert!(!scheduler.console_busy());
        assert!(scheduler.try_console().is_some());
    }

    #[test]
    fn test_gates_are_independent() {
        let scheduler = Scheduler::new();
        let _console = scheduler.try_console().unwrap();
        let events = scheduler.try_events();
        assert!(events.is_some());
        assert!(scheduler.try_events().is_none());
        assert!(scheduler.try_director().is_some());
        assert!(!scheduler.director_busy());
    }
}
