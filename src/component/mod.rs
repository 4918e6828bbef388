//! Pattern-matched component handlers.
//!
//! Registration order matters: the dispatcher takes the first structural
//! match, so more specific patterns must register before broader ones.

pub mod btn_msg;
pub mod btn_role;
pub mod dud;
pub mod pick_msg;
pub mod pick_role;

use crate::pattern::PatternRegistry;

/// Registers every built-in component, in dispatch priority order.
pub fn register_all(registry: &mut PatternRegistry) {
    registry.register(btn_role::entry());
    registry.register(pick_role::entry());
    registry.register(btn_msg::entry());
    registry.register(pick_msg::entry());
    registry.register(dud::entry());
}

/// Soft denial shared by every restricted component.
pub(crate) const MISSING_ROLES_MESSAGE: &str =
    "You do not have the required roles to select this option.";

/// Soft denial for guild-only components invoked from a DM.
pub(crate) const GUILD_ONLY_MESSAGE: &str = "This component can only be used in a server.";
