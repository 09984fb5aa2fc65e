//! Session lifecycle: credential exchange, persistence and the auth context
//! that gates which screens render.

mod context;
mod credentials;
mod firebase;
mod session;
mod store;

pub use context::{AuthContext, AuthState, Screen};
pub use credentials::CredentialExchange;
pub use firebase::FirebaseIdentity;
pub use session::{Session, SessionOrigin};
pub use store::{SessionStore, SESSION_KEY};
