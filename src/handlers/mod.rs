// handlers/mod.rs - Handler tiers
//
// Public handlers need no identity. Protected handlers sit behind the
// authorization gate and receive `Extension<AuthenticatedUser>`.
pub mod protected;
pub mod public;
