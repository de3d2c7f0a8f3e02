//! GetAvailableSlotsHandler - Query handler for a professional's open slots.

use std::sync::Arc;

use crate::domain::appointment::BookingError;
use crate::domain::foundation::ProfessionalId;
use crate::domain::scheduling::{DayFilter, Slot};
use crate::ports::{Clock, SlotStore};

#[derive(Debug, Clone)]
pub struct GetAvailableSlotsQuery {
    pub professional_id: String,
    pub filter: Option<DayFilter>,
}

pub struct GetAvailableSlotsHandler {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
}

impl GetAvailableSlotsHandler {
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>) -> Self {
        Self { slots, clock }
    }

    /// Available slots that have not yet ended, ascending by date and time.
    pub async fn handle(&self, query: GetAvailableSlotsQuery) -> Result<Vec<Slot>, BookingError> {
        let professional_id = ProfessionalId::new(query.professional_id)?;
        let now = self.clock.now();
        let slots = self.slots.list_available(&professional_id, query.filter).await?;
        Ok(slots.into_iter().filter(|s| !s.is_elapsed(now)).collect())
    }
}
