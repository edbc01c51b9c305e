use super::events::Event;

/// Observer for progress events emitted while `start` runs.
pub trait Reporter {
    fn report(&mut self, event: Event);
}

impl Reporter for () {
    fn report(&mut self, _event: Event) {}
}

/// Collects events in order; handy for callers that render progress afterwards.
impl Reporter for Vec<Event> {
    fn report(&mut self, event: Event) {
        self.push(event);
    }
}
