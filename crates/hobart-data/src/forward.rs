//! Forward returns for evaluation.

use crate::Result;
use crate::panel::Panel;
use crate::schema::{DATE, ENTITY_ID, FORWARD_RETURN, RETURN};
use polars::prelude::*;

/// Next-period return for every entity-date that has one.
///
/// The return on the following observation of the same entity is shifted
/// back onto the current row. Each entity's last date has no forward
/// return and is dropped.
///
/// Returns a DataFrame with columns: `date`, `entity_id`, `fwd_return`.
pub fn forward_returns(panel: &Panel) -> Result<DataFrame> {
    let result = panel
        .lazy()
        .sort(
            [ENTITY_ID, DATE],
            SortMultipleOptions::default().with_order_descending_multi([false, false]),
        )
        .select([
            col(DATE),
            col(ENTITY_ID),
            col(RETURN)
                .shift(lit(-1))
                .over([col(ENTITY_ID)])
                .alias(FORWARD_RETURN),
        ])
        .filter(col(FORWARD_RETURN).is_not_null())
        .sort(
            [DATE, ENTITY_ID],
            SortMultipleOptions::default().with_order_descending_multi([false, false]),
        )
        .collect()?;

    Ok(result)
}
