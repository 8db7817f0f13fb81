//! Status helper enum mapping to the `payment_statuses` SMALLINT lookup
//! table. Variant discriminants match the seed data in the migration.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Payment confirmation state.
///
/// Transitions are only `Pending -> Confirmed` and `Pending -> Failed`,
/// both performed as conditional updates in `PaymentRepo`. `Confirmed`
/// and `Failed` are terminal.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending = 1,
    Confirmed = 2,
    Failed = 3,
}

impl PaymentStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Resolve a database status ID back to the enum.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Confirmed),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Lowercase name matching the lookup table seed data.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl From<PaymentStatus> for StatusId {
    fn from(value: PaymentStatus) -> Self {
        value as StatusId
    }
}
