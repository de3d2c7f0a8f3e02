//! PublishAvailabilityHandler - Command handler for replacing a professional's availability.

use std::sync::Arc;

use crate::domain::appointment::BookingError;
use crate::domain::foundation::{ProfessionalId, ValidationError};
use crate::domain::scheduling::{validate_windows, AvailabilityInput, AvailabilityRule, Schedule};
use crate::ports::{Clock, SlotStore};

/// Upper bound on slots produced by one publication.
pub const MAX_SLOTS_PER_PUBLICATION: usize = 2_000;

/// Command to publish availability.
///
/// Explicit windows and rule expansions are combined; together they become
/// the professional's full set of open slots.
#[derive(Debug, Clone, Default)]
pub struct PublishAvailabilityCommand {
    pub professional_id: String,
    pub availability: Vec<AvailabilityInput>,
    pub rules: Vec<AvailabilityRule>,
}

pub struct PublishAvailabilityHandler {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
}

impl PublishAvailabilityHandler {
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { slots, clock }
    }

    pub async fn handle(&self, cmd: PublishAvailabilityCommand) -> Result<Schedule, BookingError> {
        let professional_id = ProfessionalId::new(cmd.professional_id)?;
        let now = self.clock.now();

        let mut inputs = cmd.availability;
        for rule in &cmd.rules {
            inputs.extend(rule.expand()?.into_iter().map(AvailabilityInput::new));
        }

        if inputs.len() > MAX_SLOTS_PER_PUBLICATION {
            return Err(ValidationError::out_of_range(
                "availability",
                0,
                MAX_SLOTS_PER_PUBLICATION as i64,
                inputs.len() as i64,
            )
            .into());
        }

        let windows: Vec<_> = inputs.iter().map(|i| i.window).collect();
        validate_windows(&windows)?;

        // Existing slots may be resubmitted as-is; new ones must lie ahead.
        if let Some(past) = inputs
            .iter()
            .find(|i| i.id.is_none() && !i.window.ends_at().is_after(&now))
        {
            return Err(BookingError::validation(
                "availability",
                format!("{} {} has already ended", past.window.date, past.window.end_time),
            ));
        }

        let schedule = self.slots.publish(&professional_id, &inputs, now).await?;
        tracing::info!(
            professional_id = %professional_id,
            slots = schedule.slots.len(),
            "Availability published"
        );
        Ok(schedule)
    }
}
