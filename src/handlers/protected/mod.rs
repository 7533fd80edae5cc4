// handlers/protected/mod.rs - Handlers behind the authorization gate
pub mod notes; // POST /notes, PUT|PATCH|DELETE /notes/:id
pub mod users; // GET /users/me
