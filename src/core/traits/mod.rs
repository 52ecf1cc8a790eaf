pub mod session;

pub use session::{
    PersistenceError, PersistenceResult, Session, SessionFactory, SessionHandle,
};
