/// Router Module Index
///
/// Routes are grouped by who may call them. Access control is attached to each group as a
/// layer in `create_router` (authentication) or inside the group itself (role checks), so
/// a handler can never be mounted without its guard.

/// Routes open to anonymous clients: banner, health, register, login.
pub mod public;

/// Routes for any authenticated principal, whatever the role.
pub mod authenticated;

/// Routes restricted to the citizen role.
pub mod citizen;

/// Routes for municipal staff: administrators and service providers.
pub mod staff;

/// Routes restricted to administrators.
pub mod admin;
