pub mod note;
pub mod user;

pub use note::{NewNote, Note, NoteChanges, OwnershipError};
pub use user::{AuthenticatedUser, NewUser, User};
