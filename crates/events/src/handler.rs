/// Decide and evolve in one step: `handle` the command, then `apply` every
/// resulting event to the aggregate in place.
///
/// Useful in domain tests and anywhere persistence is not involved; the
/// infrastructure dispatcher performs the same two steps around the store.
pub fn execute<A>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error>
where
    A: procura_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
