/// Condition a decoded entity must satisfy to complete the run.
pub trait Predicate<E>: Send + Sync + 'static {
    fn matches(&self, entity: &E) -> bool;
}

impl<E, F> Predicate<E> for F
where
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    fn matches(&self, entity: &E) -> bool {
        self(entity)
    }
}
