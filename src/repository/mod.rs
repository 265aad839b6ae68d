//! Repository layer: in-memory tables owned by the process
//!
//! Every method runs synchronously under a single table lock, so a mutation
//! is either fully applied or not applied at all.

pub mod bookings;
pub mod closures;
pub mod credits;
pub mod equipment;
pub mod users;

/// Main repository struct holding every table
#[derive(Clone, Default)]
pub struct Repository {
    pub equipment: equipment::EquipmentRepository,
    pub bookings: bookings::BookingsRepository,
    pub credits: credits::CreditsRepository,
    pub users: users::UsersRepository,
    pub closures: closures::ClosuresRepository,
}

impl Repository {
    /// Create a new, empty repository
    pub fn new() -> Self {
        Self::default()
    }
}
