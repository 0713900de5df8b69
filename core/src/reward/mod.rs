//! Reward resolution
//!
//! When a tracked boss dies, each enabled category's ranking is broadcast and
//! every configured tier pays the participant at its rank:
//!
//! - commands are dispatched now, or queued if the participant is offline
//! - loot tables are rolled for connected participants only
//! - items go to the inventory, with leftovers dropped (optionally
//!   owner-protected), or are queued while offline
//!
//! Queued rewards are delivered shortly after the participant rejoins.

mod error;
mod items;
mod pending;
mod protection;
mod resolver;

#[cfg(test)]
mod resolver_tests;

pub use error::RewardError;
pub use items::{
    ItemCatalog, ItemStack, granted_amount, is_unsafe_command, resolve_item, sanitize_loot_table,
    sanitize_name,
};
pub use pending::{PendingItem, PendingReward, PendingRewardQueue, PendingSnapshot, deliver_pending};
pub use protection::{PickupDecision, PickupGuard};
pub use resolver::{
    Payout, PayoutReport, RANKING_DISPLAY_LIMIT, RewardCtx, distribute_rewards, effective_multiplier,
    ranking_lines,
};
