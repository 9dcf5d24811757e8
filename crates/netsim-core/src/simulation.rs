//! The turn scheduler: drives the three phases in fixed order for a
//! bounded horizon and invokes an observer after each turn.

use crate::factory::{Factory, FactoryError};
use crate::id::Time;
use tracing::trace;

/// Errors that can abort a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The factory failed the consistency check; no turn was executed.
    #[error("factory topology is inconsistent")]
    InconsistentTopology,
    /// A phase failed mid-turn. Indicates a programming error in a
    /// structural edit; no recovery is attempted.
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Run `horizon` turns of the simulation.
///
/// Each turn executes deliveries, package passing and work, in that
/// order, then hands the factory to `observer`. The ordering means a
/// package delivered at turn `t` reaches its worker and starts
/// processing within turn `t`, while a package finished at turn `t`
/// leaves the worker during turn `t + 1`'s passing phase.
///
/// Fails with [`SimulationError::InconsistentTopology`] before any turn
/// runs if the factory is inconsistent. The engine never performs a
/// partial turn: any mid-turn failure aborts the whole call.
pub fn simulate<F>(
    factory: &mut Factory,
    horizon: Time,
    mut observer: F,
) -> Result<(), SimulationError>
where
    F: FnMut(&Factory, Time),
{
    if !factory.is_consistent() {
        return Err(SimulationError::InconsistentTopology);
    }

    for t in 1..=horizon {
        trace!(turn = t, "executing turn");
        factory.do_deliveries(t);
        factory.do_package_passing()?;
        factory.do_work(t);
        observer(factory, t);
    }
    Ok(())
}
