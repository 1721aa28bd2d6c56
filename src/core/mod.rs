pub mod calculator;
pub mod chat;
pub mod comparison;
pub mod error;
pub mod factors;
pub mod tips;

pub use calculator::{compute, format_amount, round_to, FootprintResult, LifestyleInput};
pub use chat::{ChatMessage, ConversationState, Role};
pub use comparison::{compare, ComparisonVerdict};
pub use error::{CalcError, Result};
pub use factors::{Category, DietType, FactorTable, Region, RegionFactors, TransportMode};
pub use tips::{highest_category, tips_for, top_tips};
