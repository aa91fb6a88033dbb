pub mod email;
pub mod signals;

pub use email::{EmailRecord, TriagedEmail};
pub use signals::{
    ActionLevel, DecisionLevel, EmailType, PriorityTier, SecurityFlags, SignalBundle, Urgency,
    UserConfig,
};
